//! Filesystem-backed content store.
//!
//! A tutorial is a directory under the store root containing a
//! `tutorial.toml` manifest and one Markdown file per chapter:
//!
//! ```toml
//! title = "Async Rust from the ground up"
//!
//! [[chapters]]
//! id     = "intro"
//! number = 1
//! title  = "Introduction"
//! file   = "01-intro.md"
//! ```
//!
//! Content references produced by `list_chapters` are
//! `<tutorial-id>/<file>` paths relative to the store root.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Chapter, ContentStore, StoreError, TutorialInfo, sort_chapters};

/// Name of the per-tutorial manifest file.
pub const MANIFEST_FILE: &str = "tutorial.toml";

/// Store over a directory of tutorial directories.
#[derive(Debug, Clone)]
pub struct FsStore {
  root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Manifest {
  title:    String,
  #[serde(default)]
  chapters: Vec<ManifestChapter>,
}

#[derive(Debug, Deserialize)]
struct ManifestChapter {
  id:     String,
  number: u32,
  title:  String,
  file:   String,
}

impl FsStore {
  /// Create a store rooted at the given directory.
  #[must_use]
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  async fn manifest(&self, tutorial_id: &str) -> Result<Manifest, StoreError> {
    let path = self.root.join(tutorial_id).join(MANIFEST_FILE);
    let locator = format!("{tutorial_id}/{MANIFEST_FILE}");
    let text = tokio::fs::read_to_string(&path)
      .await
      .map_err(|e| StoreError::from_io(&locator, &e))?;
    toml::from_str(&text)
      .map_err(|e| StoreError::Decode(format!("{locator}: {e}")))
  }
}

#[async_trait]
impl ContentStore for FsStore {
  async fn tutorial_info(
    &self,
    tutorial_id: &str,
  ) -> Result<TutorialInfo, StoreError> {
    let manifest = self.manifest(tutorial_id).await?;
    Ok(TutorialInfo {
      id:    tutorial_id.to_string(),
      title: manifest.title,
    })
  }

  async fn list_chapters(
    &self,
    tutorial_id: &str,
  ) -> Result<Vec<Chapter>, StoreError> {
    let manifest = self.manifest(tutorial_id).await?;
    let chapters = manifest
      .chapters
      .into_iter()
      .map(|c| {
        Chapter {
          id:          c.id,
          number:      c.number,
          title:       c.title,
          content_ref: format!("{tutorial_id}/{}", c.file),
        }
      })
      .collect();
    Ok(sort_chapters(chapters))
  }

  async fn fetch_content(
    &self,
    content_ref: &str,
  ) -> Result<String, StoreError> {
    let path = self.root.join(content_ref);
    let bytes = tokio::fs::read(&path)
      .await
      .map_err(|e| StoreError::from_io(content_ref, &e))?;
    String::from_utf8(bytes)
      .map_err(|e| StoreError::Decode(format!("{content_ref}: {e}")))
  }
}
