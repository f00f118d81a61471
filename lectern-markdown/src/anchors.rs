//! Heading extraction and anchor assignment.
//!
//! Scans raw Markdown for ATX-style headings (1-6 `#` markers, whitespace,
//! then text), skipping fenced code regions, and assigns every heading a
//! unique anchor id. Collision state is scoped to a single pass: re-running
//! the indexer on the same document reproduces the exact same anchors.

use std::{
  collections::{HashMap, HashSet},
  sync::LazyLock,
};

use regex::Regex;

use crate::{
  types::Heading,
  utils::{FenceTracker, clean_inline, never_matching_regex, slugify},
};

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(#{1,6})\s+(.+)$").unwrap_or_else(|e| {
    log::error!("failed to compile HEADING_RE regex: {e}");
    never_matching_regex()
  })
});

/// Pass-scoped collision table for anchor ids.
///
/// The disambiguation policy is occurrence-based: the first occurrence of a
/// canonical slug keeps it verbatim and the n-th collision receives a `-<n>`
/// suffix. A used-set guards against a literal heading (say "Overview 1")
/// colliding with a previously generated `overview-1`.
#[derive(Debug, Default)]
pub struct AnchorTable {
  counts: HashMap<String, usize>,
  used:   HashSet<String>,
}

impl AnchorTable {
  /// Create an empty table. One table per render pass; no shared state.
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Assign a unique anchor for the given heading text.
  ///
  /// `position` is the 0-based index of the heading in document order; it is
  /// only used as a fallback when the canonical slug comes out empty (e.g. a
  /// heading made entirely of punctuation).
  pub fn assign(&mut self, text: &str, position: usize) -> String {
    let canonical = slugify(text);
    let base = if canonical.is_empty() {
      format!("section-{position}")
    } else {
      canonical
    };

    let mut occurrence = self.counts.get(&base).copied().unwrap_or(0);
    loop {
      let candidate = if occurrence == 0 {
        base.clone()
      } else {
        format!("{base}-{occurrence}")
      };
      if !self.used.contains(&candidate) {
        self.counts.insert(base, occurrence + 1);
        self.used.insert(candidate.clone());
        return candidate;
      }
      occurrence += 1;
    }
  }
}

/// Extract all ATX headings from raw Markdown, in document order, with
/// unique anchor ids assigned.
///
/// Setext headings are not recognized, and heading-looking lines inside
/// fenced code blocks are skipped. This operation does not fail; malformed
/// input degrades to zero headings extracted.
#[must_use]
pub fn index_headings(markdown: &str) -> Vec<Heading> {
  let mut headings = Vec::new();
  let mut table = AnchorTable::new();
  let mut fences = FenceTracker::new();

  for line in markdown.lines() {
    let next = fences.process_line(line);
    if fences.in_code_block() || next.in_code_block() {
      fences = next;
      continue;
    }
    fences = next;

    // Up to three leading spaces keep a line a heading; four make it an
    // indented code block.
    let stripped = line.trim_end();
    let indent = stripped.len() - stripped.trim_start_matches(' ').len();
    if indent > 3 {
      continue;
    }

    let Some(caps) = HEADING_RE.captures(&stripped[indent..]) else {
      continue;
    };

    #[allow(clippy::cast_possible_truncation, reason = "marker run is 1..=6")]
    let level = caps[1].len() as u8;
    let text = clean_inline(strip_closing_sequence(&caps[2]));
    let id = table.assign(&text, headings.len());

    headings.push(Heading { text, level, id });
  }

  headings
}

/// Strip an optional ATX closing sequence (`## Title ##` -> `Title`).
fn strip_closing_sequence(text: &str) -> &str {
  let trimmed = text.trim_end();
  let without_hashes = trimmed.trim_end_matches('#');
  if without_hashes.len() == trimmed.len() {
    return trimmed;
  }
  // The closing run only counts when separated from the text by whitespace.
  if without_hashes.ends_with(char::is_whitespace) {
    without_hashes.trim_end()
  } else {
    trimmed
  }
}
