//! Chapter session: orchestrates chapter selection, content fetch, and
//! rendering, suppressing results from superseded fetches.
//!
//! The session is an actor on a single tokio task. Reader commands and
//! asynchronous completions arrive on one channel and are handled strictly
//! in arrival order, so state is only ever mutated from one place; spawned
//! fetches communicate back as messages tagged with the fetch generation
//! that was current when they were issued, and a fetch whose generation is
//! no longer current is discarded without touching any state. Diagram
//! completions instead carry the chapter they were rendered for and apply
//! only while that chapter's document is the one displayed. Those
//! compare-and-discard checks are the whole concurrency story: a fast
//! sequence of chapter switches can never display content, headings, or a
//! TOC belonging to a chapter the reader has since navigated away from.

use std::sync::Arc;

use lectern_diagram::{DiagramEngine, DiagramEntry};
use lectern_markdown::{
  DocumentRenderer,
  renderer::{diagram_failure, diagram_placeholder, diagram_success},
};
use lectern_store::{Chapter, ContentStore, StoreError, TutorialInfo};
use log::{debug, warn};
use tokio::sync::{mpsc, watch};

use crate::toc::{TocEntry, navigation_index};

/// Session display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  /// Nothing selected yet (chapter list still loading).
  Idle,
  /// A content fetch for the selected chapter is in flight.
  Loading,
  /// A chapter is rendered and current.
  Displaying,
  /// The tutorial exists but has no chapters. Terminal; distinct from
  /// `Error` so surrounding UI does not offer retry loops.
  Empty,
  /// The current-generation fetch failed; retryable.
  Error,
}

/// The rendered document currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedDocument {
  pub chapter_id: String,
  pub title:      Option<String>,
  /// Rendered HTML. Diagram placeholders are swapped in place as their
  /// renders settle, so observers see the document update progressively.
  pub html:       String,
}

/// Everything the surrounding layout needs, published as one consistent
/// unit per change: content, TOC, and state always describe the same
/// chapter.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
  pub state:             SessionState,
  pub tutorial_title:    Option<String>,
  pub chapters:          Vec<Chapter>,
  pub displayed_chapter: Option<String>,
  pub document:          Option<DisplayedDocument>,
  pub toc:               Vec<TocEntry>,
  pub error:             Option<String>,
  /// Bumped exactly on a successful `Loading -> Displaying` transition.
  /// Consumers reset scroll position when it changes, never on a mere
  /// selection attempt.
  pub scroll_epoch:      u64,
}

impl SessionSnapshot {
  fn initial() -> Self {
    Self {
      state:             SessionState::Idle,
      tutorial_title:    None,
      chapters:          Vec::new(),
      displayed_chapter: None,
      document:          None,
      toc:               Vec::new(),
      error:             None,
      scroll_epoch:      0,
    }
  }
}

enum SessionMsg {
  Select(String),
  Retry,
  InfoLoaded(Result<TutorialInfo, StoreError>),
  ChaptersLoaded {
    generation: u64,
    result:     Result<Vec<Chapter>, StoreError>,
  },
  ContentFetched {
    generation: u64,
    chapter:    Chapter,
    result:     Result<String, StoreError>,
  },
  DiagramRendered {
    chapter_id: String,
    key:        usize,
    entry:      DiagramEntry,
  },
}

/// Handle to a running chapter session.
///
/// Cloneable; once every handle is dropped the session task exits on the
/// next message it processes.
#[derive(Debug, Clone)]
pub struct ChapterSession {
  tx:          mpsc::UnboundedSender<SessionMsg>,
  snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl ChapterSession {
  /// Spawn a session for one tutorial.
  ///
  /// Fetches tutorial metadata and the chapter list concurrently, then
  /// auto-selects the first chapter as soon as the list arrives.
  pub fn spawn<S, E>(
    store: Arc<S>,
    engine: Arc<E>,
    renderer: DocumentRenderer,
    tutorial_id: impl Into<String>,
  ) -> Self
  where
    S: ContentStore + 'static,
    E: DiagramEngine + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::initial());

    let inner = SessionInner {
      store,
      engine,
      renderer,
      tutorial_id: tutorial_id.into(),
      tx: tx.clone(),
      snapshot_tx,
      generation: 0,
      selected: None,
      snapshot: SessionSnapshot::initial(),
    };
    tokio::spawn(run(inner, rx));

    Self { tx, snapshot_rx }
  }

  /// Select a chapter by id. Selecting the chapter already displayed is a
  /// no-op (no refetch, no TOC flicker).
  pub fn select_chapter(&self, chapter_id: &str) {
    let _ = self.tx.send(SessionMsg::Select(chapter_id.to_string()));
  }

  /// Retry after an `Error` state, re-issuing the failed fetch under a new
  /// generation.
  pub fn retry(&self) {
    let _ = self.tx.send(SessionMsg::Retry);
  }

  /// The latest published snapshot.
  #[must_use]
  pub fn snapshot(&self) -> SessionSnapshot {
    self.snapshot_rx.borrow().clone()
  }

  /// Subscribe to snapshot changes.
  #[must_use]
  pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
    self.snapshot_rx.clone()
  }
}

async fn run<S, E>(
  mut inner: SessionInner<S, E>,
  mut rx: mpsc::UnboundedReceiver<SessionMsg>,
) where
  S: ContentStore + 'static,
  E: DiagramEngine + 'static,
{
  inner.bootstrap();
  while let Some(msg) = rx.recv().await {
    inner.handle(msg);
    // The inner tx clone (held for spawned completions) keeps the channel
    // open, so closure is detected through the snapshot side instead.
    if inner.snapshot_tx.is_closed() {
      break;
    }
  }
}

struct SessionInner<S, E> {
  store:       Arc<S>,
  engine:      Arc<E>,
  renderer:    DocumentRenderer,
  tutorial_id: String,
  tx:          mpsc::UnboundedSender<SessionMsg>,
  snapshot_tx: watch::Sender<SessionSnapshot>,
  /// Monotonically increasing fetch generation. Every spawned completion
  /// carries the generation it was issued under; on arrival it is honored
  /// only if still current.
  generation:  u64,
  /// Chapter the session is loading or displaying (the retry target).
  selected:    Option<Chapter>,
  snapshot:    SessionSnapshot,
}

impl<S, E> SessionInner<S, E>
where
  S: ContentStore + 'static,
  E: DiagramEngine + 'static,
{
  fn publish(&self) {
    let _ = self.snapshot_tx.send(self.snapshot.clone());
  }

  fn bootstrap(&mut self) {
    let store = Arc::clone(&self.store);
    let tx = self.tx.clone();
    let tutorial_id = self.tutorial_id.clone();
    tokio::spawn(async move {
      let result = store.tutorial_info(&tutorial_id).await;
      let _ = tx.send(SessionMsg::InfoLoaded(result));
    });

    self.generation += 1;
    let generation = self.generation;
    let store = Arc::clone(&self.store);
    let tx = self.tx.clone();
    let tutorial_id = self.tutorial_id.clone();
    tokio::spawn(async move {
      let result = store.list_chapters(&tutorial_id).await;
      let _ = tx.send(SessionMsg::ChaptersLoaded { generation, result });
    });
  }

  fn handle(&mut self, msg: SessionMsg) {
    match msg {
      SessionMsg::Select(id) => self.handle_select(&id),
      SessionMsg::Retry => self.handle_retry(),
      SessionMsg::InfoLoaded(result) => self.handle_info(result),
      SessionMsg::ChaptersLoaded { generation, result } => {
        self.handle_chapters(generation, result);
      },
      SessionMsg::ContentFetched {
        generation,
        chapter,
        result,
      } => self.handle_content(generation, &chapter, result),
      SessionMsg::DiagramRendered {
        chapter_id,
        key,
        entry,
      } => self.handle_diagram(&chapter_id, key, &entry),
    }
  }

  fn handle_select(&mut self, chapter_id: &str) {
    if self.snapshot.state == SessionState::Displaying
      && self.snapshot.displayed_chapter.as_deref() == Some(chapter_id)
    {
      debug!("chapter {chapter_id} already displayed; ignoring selection");
      return;
    }
    let Some(chapter) =
      self.snapshot.chapters.iter().find(|c| c.id == chapter_id).cloned()
    else {
      warn!("selected unknown chapter {chapter_id}");
      return;
    };
    self.begin_load(chapter);
  }

  fn handle_retry(&mut self) {
    if self.snapshot.state != SessionState::Error {
      debug!("retry outside Error state ignored");
      return;
    }
    if let Some(chapter) = self.selected.clone() {
      self.begin_load(chapter);
    } else {
      // The chapter list itself failed to load; fetch it again.
      self.snapshot.state = SessionState::Idle;
      self.snapshot.error = None;
      self.publish();
      self.bootstrap();
    }
  }

  fn handle_info(&mut self, result: Result<TutorialInfo, StoreError>) {
    match result {
      Ok(info) => {
        self.snapshot.tutorial_title = Some(info.title);
        self.publish();
      },
      Err(e) => warn!("tutorial metadata fetch failed: {e}"),
    }
  }

  fn handle_chapters(
    &mut self,
    generation: u64,
    result: Result<Vec<Chapter>, StoreError>,
  ) {
    if generation != self.generation {
      debug!(
        "discarding stale chapter list (generation {generation}, current {})",
        self.generation
      );
      return;
    }
    match result {
      Ok(chapters) if chapters.is_empty() => {
        self.snapshot.chapters = Vec::new();
        self.snapshot.state = SessionState::Empty;
        self.publish();
      },
      Ok(chapters) => {
        let first = chapters[0].clone();
        self.snapshot.chapters = chapters;
        self.publish();
        self.begin_load(first);
      },
      Err(e) => {
        self.snapshot.state = SessionState::Error;
        self.snapshot.error = Some(e.to_string());
        self.publish();
      },
    }
  }

  /// Enter `Loading` for a chapter under a fresh generation.
  fn begin_load(&mut self, chapter: Chapter) {
    self.generation += 1;
    let generation = self.generation;
    self.selected = Some(chapter.clone());
    self.snapshot.state = SessionState::Loading;
    self.snapshot.error = None;
    self.publish();

    let store = Arc::clone(&self.store);
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = store.fetch_content(&chapter.content_ref).await;
      let _ = tx.send(SessionMsg::ContentFetched {
        generation,
        chapter,
        result,
      });
    });
  }

  fn handle_content(
    &mut self,
    generation: u64,
    chapter: &Chapter,
    result: Result<String, StoreError>,
  ) {
    if generation != self.generation {
      debug!(
        "discarding stale fetch for chapter {} (generation {generation}, \
         current {})",
        chapter.id, self.generation
      );
      return;
    }

    match result {
      Ok(markdown) => {
        let doc = self.renderer.render_with_recovery(&markdown);

        self.snapshot.document = Some(DisplayedDocument {
          chapter_id: chapter.id.clone(),
          title:      doc.title.clone(),
          html:       doc.html,
        });
        self.snapshot.displayed_chapter = Some(chapter.id.clone());
        self.snapshot.toc = navigation_index(&doc.headings);
        self.snapshot.state = SessionState::Displaying;
        self.snapshot.error = None;
        self.snapshot.scroll_epoch += 1;
        self.publish();

        for (key, source) in doc.diagram_sources.into_iter().enumerate() {
          let engine = Arc::clone(&self.engine);
          let tx = self.tx.clone();
          let chapter_id = chapter.id.clone();
          tokio::spawn(async move {
            let outcome = engine.render_diagram(&source).await;
            let _ = tx.send(SessionMsg::DiagramRendered {
              chapter_id,
              key,
              entry: DiagramEntry { source, outcome },
            });
          });
        }
      },
      Err(e) => {
        // Previously displayed content stays put; only the state flips.
        self.snapshot.state = SessionState::Error;
        self.snapshot.error = Some(e.to_string());
        self.publish();
      },
    }
  }

  fn handle_diagram(
    &mut self,
    chapter_id: &str,
    key: usize,
    entry: &DiagramEntry,
  ) {
    // Diagrams are checked against the displayed document rather than the
    // fetch generation: a failed selection bumps the generation while the
    // previous chapter stays on screen, and its diagrams must still land.
    let Some(document) = self.snapshot.document.as_mut() else {
      return;
    };
    if document.chapter_id != chapter_id {
      debug!(
        "discarding diagram for superseded chapter {chapter_id} \
         (displaying {})",
        document.chapter_id
      );
      return;
    }

    let markup = match &entry.outcome {
      Ok(svg) => diagram_success(key, svg),
      Err(e) => {
        warn!("diagram {key} failed: {e}");
        diagram_failure(key)
      },
    };
    // Duplicate sources share a key, so replace every occurrence.
    document.html = document.html.replace(&diagram_placeholder(key), &markup);
    self.publish();
  }
}
