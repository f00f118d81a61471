//! # lectern-markdown - the tutorial chapter rendering pipeline
//!
//! Turns raw Markdown chapter text into a navigable HTML document: headings
//! receive stable, collision-free anchor ids, fenced `mermaid` blocks become
//! keyed placeholders that an asynchronous diagram engine fills in later, and
//! every other fenced code block is rendered as a highlighted block with a
//! copy-to-clipboard affordance.
//!
//! ## Quick start
//!
//! ```rust
//! use lectern_markdown::{DocumentRenderer, RendererOptions};
//!
//! let renderer = DocumentRenderer::new(RendererOptions::default());
//! let doc = renderer.render("# Hello\n\nSome **bold** text.");
//!
//! assert_eq!(doc.headings[0].id, "hello");
//! assert!(doc.html.contains("id=\"hello\""));
//! ```
//!
//! Rendering is pure with respect to its input: calling [`DocumentRenderer::render`]
//! twice on the same string yields byte-identical output, anchors included.
//! Anchor collision state lives in a pass-scoped [`anchors::AnchorTable`],
//! never in process-wide counters.

pub mod anchors;
pub mod renderer;
mod types;
pub mod utils;

pub use crate::{
  anchors::index_headings,
  renderer::{DocumentRenderer, RendererOptions},
  types::{Heading, RenderedDocument},
};
