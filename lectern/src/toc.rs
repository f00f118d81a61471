//! Navigation index: the table of contents derived from the currently
//! displayed document.
//!
//! Purely a projection of the heading indexer output; it has no lifecycle of
//! its own and is recomputed from scratch on every completed render pass.

use lectern_markdown::Heading;
use serde::Serialize;

/// One TOC entry. `anchor_id` matches the `id` attribute of exactly one
/// heading element in the rendered document, so `#<anchor_id>` fragment
/// navigation resolves to it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TocEntry {
  pub anchor_id: String,
  pub text:      String,
  pub level:     u8,
}

/// Project a heading list into the navigation index.
#[must_use]
pub fn navigation_index(headings: &[Heading]) -> Vec<TocEntry> {
  headings
    .iter()
    .map(|h| {
      TocEntry {
        anchor_id: h.id.clone(),
        text:      h.text.clone(),
        level:     h.level,
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn projects_headings_one_to_one() {
    let headings = vec![
      Heading {
        text:  "One".into(),
        level: 1,
        id:    "one".into(),
      },
      Heading {
        text:  "Two".into(),
        level: 2,
        id:    "two".into(),
      },
    ];
    let toc = navigation_index(&headings);
    assert_eq!(toc.len(), 2);
    assert_eq!(toc[0].anchor_id, "one");
    assert_eq!(toc[1].level, 2);
  }
}
