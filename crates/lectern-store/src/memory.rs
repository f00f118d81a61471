//! In-memory content store for tests and embedded use.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{Chapter, ContentStore, StoreError, TutorialInfo, sort_chapters};

/// A store holding a single tutorial in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  info:     Option<TutorialInfo>,
  chapters: Vec<Chapter>,
  content:  HashMap<String, String>,
}

impl MemoryStore {
  /// Create an empty store for the given tutorial.
  #[must_use]
  pub fn new(info: TutorialInfo) -> Self {
    Self {
      info:     Some(info),
      chapters: Vec::new(),
      content:  HashMap::new(),
    }
  }

  /// Add a chapter together with its Markdown text.
  #[must_use]
  pub fn with_chapter(
    mut self,
    chapter: Chapter,
    markdown: impl Into<String>,
  ) -> Self {
    self
      .content
      .insert(chapter.content_ref.clone(), markdown.into());
    self.chapters.push(chapter);
    self
  }
}

#[async_trait]
impl ContentStore for MemoryStore {
  async fn tutorial_info(
    &self,
    tutorial_id: &str,
  ) -> Result<TutorialInfo, StoreError> {
    match &self.info {
      Some(info) if info.id == tutorial_id => Ok(info.clone()),
      _ => Err(StoreError::NotFound(tutorial_id.to_string())),
    }
  }

  async fn list_chapters(
    &self,
    tutorial_id: &str,
  ) -> Result<Vec<Chapter>, StoreError> {
    match &self.info {
      Some(info) if info.id == tutorial_id => {
        Ok(sort_chapters(self.chapters.clone()))
      },
      _ => Err(StoreError::NotFound(tutorial_id.to_string())),
    }
  }

  async fn fetch_content(
    &self,
    content_ref: &str,
  ) -> Result<String, StoreError> {
    self
      .content
      .get(content_ref)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(content_ref.to_string()))
  }
}
