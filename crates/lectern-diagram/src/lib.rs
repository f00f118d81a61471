//! Asynchronous diagram rendering.
//!
//! A [`DiagramEngine`] is a black box turning diagram source text into
//! renderable markup. [`render_all`] drives one document's worth of distinct
//! sources through the engine concurrently; individual failures degrade to
//! per-entry errors and never invalidate the other diagrams in the pass.
//! Entries are keyed by exact source text and live only for the pass that
//! produced them; nothing is cached across chapters.

pub mod mermaid;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;

/// Error type for a single diagram render. Contained per-entry; a failed
/// diagram becomes a visible placeholder, never a failed document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiagramError {
  /// The diagram source itself is malformed.
  #[error("diagram syntax error: {0}")]
  Syntax(String),

  /// The engine failed for reasons unrelated to the source.
  #[error("diagram engine error: {0}")]
  Engine(String),
}

/// Result of rendering one distinct diagram source within a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramEntry {
  /// Exact source text of the fenced block, whitespace included.
  pub source:  String,
  /// Rendered markup, or the error this slot degrades to.
  pub outcome: Result<String, DiagramError>,
}

/// An external diagram-layout engine.
#[async_trait]
pub trait DiagramEngine: Send + Sync {
  /// Render one diagram source to markup.
  async fn render_diagram(&self, source: &str)
  -> Result<String, DiagramError>;
}

/// Render every distinct source of one document render pass.
///
/// All renders are spawned concurrently; the returned vector preserves the
/// input order and settles once every render has succeeded or failed
/// individually. The engine is shared, the entries are not: each call is an
/// independent pass with its own results.
pub async fn render_all<E>(
  engine: &Arc<E>,
  sources: &[String],
) -> Vec<DiagramEntry>
where
  E: DiagramEngine + ?Sized + 'static,
{
  let mut set = JoinSet::new();
  for (index, source) in sources.iter().enumerate() {
    let engine = Arc::clone(engine);
    let source = source.clone();
    set.spawn(async move {
      let outcome = engine.render_diagram(&source).await;
      (index, DiagramEntry { source, outcome })
    });
  }

  let mut entries: Vec<Option<DiagramEntry>> = vec![None; sources.len()];
  while let Some(joined) = set.join_next().await {
    match joined {
      Ok((index, entry)) => entries[index] = Some(entry),
      Err(e) => log::error!("diagram render task failed to join: {e}"),
    }
  }

  entries
    .into_iter()
    .enumerate()
    .map(|(index, slot)| {
      slot.unwrap_or_else(|| {
        // Only reachable when a render task panicked or was cancelled.
        DiagramEntry {
          source:  sources[index].clone(),
          outcome: Err(DiagramError::Engine(
            "render task did not complete".to_string(),
          )),
        }
      })
    })
    .collect()
}
