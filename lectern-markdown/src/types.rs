//! Types for the lectern-markdown public API.
use serde::{Deserialize, Serialize};

/// A heading extracted from a Markdown document, in document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Heading {
  /// Visible heading text (inline markup reduced to its label form).
  pub text:  String,
  /// Heading level (1-6).
  pub level: u8,
  /// Anchor id assigned for this pass. Unique within the document,
  /// URL-fragment safe (lowercase, hyphen-separated).
  pub id:    String,
}

/// Result of one render pass over a chapter's Markdown source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedDocument {
  /// Rendered HTML. Diagram blocks appear as pending placeholders keyed by
  /// their position in `diagram_sources`.
  pub html: String,

  /// Extracted headings, one per rendered heading element, same order.
  pub headings: Vec<Heading>,

  /// Title of the document, if found (first H1).
  pub title: Option<String>,

  /// Distinct diagram source texts in first-encounter order. The index of a
  /// source is the placeholder key used in `html`; duplicate blocks with
  /// byte-identical source share one entry.
  pub diagram_sources: Vec<String>,
}
