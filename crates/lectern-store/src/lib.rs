//! Content store abstraction for lectern.
//!
//! A tutorial is an ordered list of [`Chapter`]s whose text lives behind an
//! opaque content reference. The session layer only talks to the
//! [`ContentStore`] trait; the concrete stores here are [`fs::FsStore`]
//! (a tutorial directory with a `tutorial.toml` manifest) and
//! [`memory::MemoryStore`] (in-memory, for tests and embedding).

pub mod error;
pub mod fs;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::{error::StoreError, fs::FsStore, memory::MemoryStore};

/// One unit of tutorial content. Immutable once listed; `number` ordering is
/// significant and ascending within a tutorial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chapter {
  /// Stable chapter identifier, unique within the tutorial.
  pub id:          String,
  /// Position of the chapter in reading order.
  pub number:      u32,
  /// Human-readable chapter title.
  pub title:       String,
  /// Opaque locator for the chapter text, resolved by `fetch_content`.
  pub content_ref: String,
}

/// Tutorial-level metadata, fetched independently of the chapter list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TutorialInfo {
  pub id:    String,
  pub title: String,
}

/// A key-value content store reachable by opaque path strings.
///
/// Implementations must be cheap to share (`Arc`) and safe to call from
/// concurrently spawned tasks; all methods are read-only.
#[async_trait]
pub trait ContentStore: Send + Sync {
  /// Tutorial metadata. May be fetched concurrently with `list_chapters`.
  async fn tutorial_info(
    &self,
    tutorial_id: &str,
  ) -> Result<TutorialInfo, StoreError>;

  /// All chapters of a tutorial, sorted by `number` ascending.
  async fn list_chapters(
    &self,
    tutorial_id: &str,
  ) -> Result<Vec<Chapter>, StoreError>;

  /// Raw Markdown text for one chapter.
  async fn fetch_content(
    &self,
    content_ref: &str,
  ) -> Result<String, StoreError>;
}

/// Sort chapters into reading order, warning about duplicate numbers (the
/// ordering is still deterministic, but the manifest is suspect).
pub(crate) fn sort_chapters(mut chapters: Vec<Chapter>) -> Vec<Chapter> {
  chapters.sort_by_key(|c| c.number);
  for pair in chapters.windows(2) {
    if pair[0].number == pair[1].number {
      log::warn!(
        "chapters {} and {} share number {}",
        pair[0].id,
        pair[1].id,
        pair[0].number
      );
    }
  }
  chapters
}
