//! End-to-end session behavior against controllable fakes: fetch ordering,
//! stale-result suppression, error recovery, and progressive diagram
//! completion, all under paused virtual time.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use async_trait::async_trait;
use lectern::session::{ChapterSession, SessionState};
use lectern_diagram::{DiagramEngine, DiagramError};
use lectern_markdown::{DocumentRenderer, RendererOptions};
use lectern_store::{Chapter, ContentStore, StoreError, TutorialInfo};
use tokio::time::sleep;

fn chapter(id: &str, number: u32, title: &str) -> Chapter {
  Chapter {
    id:          id.to_string(),
    number,
    title:       title.to_string(),
    content_ref: id.to_string(),
  }
}

/// Store with scripted per-chapter delays and failure counts.
struct ScriptedStore {
  chapters:       Vec<Chapter>,
  content:        HashMap<String, String>,
  delays:         HashMap<String, Duration>,
  /// Remaining failures per content ref; decremented on each failed fetch.
  fetch_failures: Mutex<HashMap<String, usize>>,
  /// Remaining failures for `list_chapters`.
  list_failures:  AtomicUsize,
  fetch_count:    AtomicUsize,
}

impl ScriptedStore {
  fn new(chapters: Vec<Chapter>) -> Self {
    Self {
      chapters,
      content: HashMap::new(),
      delays: HashMap::new(),
      fetch_failures: Mutex::new(HashMap::new()),
      list_failures: AtomicUsize::new(0),
      fetch_count: AtomicUsize::new(0),
    }
  }

  fn with_content(mut self, content_ref: &str, markdown: &str) -> Self {
    self
      .content
      .insert(content_ref.to_string(), markdown.to_string());
    self
  }

  fn with_delay(mut self, content_ref: &str, delay: Duration) -> Self {
    self.delays.insert(content_ref.to_string(), delay);
    self
  }

  fn failing_fetches(self, content_ref: &str, count: usize) -> Self {
    self
      .fetch_failures
      .lock()
      .expect("lock")
      .insert(content_ref.to_string(), count);
    self
  }

  fn failing_lists(self, count: usize) -> Self {
    self.list_failures.store(count, Ordering::SeqCst);
    self
  }

  fn fetches(&self) -> usize {
    self.fetch_count.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ContentStore for ScriptedStore {
  async fn tutorial_info(
    &self,
    tutorial_id: &str,
  ) -> Result<TutorialInfo, StoreError> {
    Ok(TutorialInfo {
      id:    tutorial_id.to_string(),
      title: "Scripted Tutorial".to_string(),
    })
  }

  async fn list_chapters(
    &self,
    _tutorial_id: &str,
  ) -> Result<Vec<Chapter>, StoreError> {
    if self
      .list_failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
        n.checked_sub(1)
      })
      .is_ok()
    {
      return Err(StoreError::Transport("list unavailable".to_string()));
    }
    Ok(self.chapters.clone())
  }

  async fn fetch_content(
    &self,
    content_ref: &str,
  ) -> Result<String, StoreError> {
    self.fetch_count.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = self.delays.get(content_ref) {
      sleep(*delay).await;
    }
    {
      let mut failures = self.fetch_failures.lock().expect("lock");
      if let Some(remaining) = failures.get_mut(content_ref) {
        if *remaining > 0 {
          *remaining -= 1;
          return Err(StoreError::Transport(format!(
            "fetch of {content_ref} failed"
          )));
        }
      }
    }
    self
      .content
      .get(content_ref)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(content_ref.to_string()))
  }
}

/// Engine rendering `fail` sources as syntax errors and everything else as a
/// trivial SVG after a fixed delay.
struct ScriptedEngine {
  delay: Duration,
}

impl ScriptedEngine {
  fn instant() -> Self {
    Self {
      delay: Duration::ZERO,
    }
  }
}

#[async_trait]
impl DiagramEngine for ScriptedEngine {
  async fn render_diagram(
    &self,
    source: &str,
  ) -> Result<String, DiagramError> {
    sleep(self.delay).await;
    if source.contains("fail") {
      Err(DiagramError::Syntax("bad source".to_string()))
    } else {
      Ok(format!("<svg>{}</svg>", source.trim()))
    }
  }
}

fn spawn_session(
  store: Arc<ScriptedStore>,
  engine: ScriptedEngine,
) -> ChapterSession {
  ChapterSession::spawn(
    store,
    Arc::new(engine),
    DocumentRenderer::new(RendererOptions::default()),
    "tut",
  )
}

#[tokio::test(start_paused = true)]
async fn displays_first_chapter_automatically() {
  let store = Arc::new(
    ScriptedStore::new(vec![
      chapter("intro", 1, "Introduction"),
      chapter("setup", 2, "Setup"),
    ])
    .with_content("intro", "# Introduction\n\nWelcome.\n")
    .with_content("setup", "# Setup\n"),
  );
  let session = spawn_session(Arc::clone(&store), ScriptedEngine::instant());

  sleep(Duration::from_millis(10)).await;
  let snapshot = session.snapshot();

  assert_eq!(snapshot.state, SessionState::Displaying);
  assert_eq!(snapshot.displayed_chapter.as_deref(), Some("intro"));
  assert_eq!(
    snapshot.tutorial_title.as_deref(),
    Some("Scripted Tutorial")
  );
  assert_eq!(snapshot.chapters.len(), 2);
  assert_eq!(snapshot.toc.len(), 1);
  assert_eq!(snapshot.toc[0].anchor_id, "introduction");
  assert_eq!(snapshot.scroll_epoch, 1);
  let document = snapshot.document.expect("document displayed");
  assert!(document.html.contains("id=\"introduction\""));
}

#[tokio::test(start_paused = true)]
async fn fast_switch_discards_slow_fetch() {
  let store = Arc::new(
    ScriptedStore::new(vec![
      chapter("slow", 1, "Slow"),
      chapter("fast", 2, "Fast"),
    ])
    .with_content("slow", "# Slow Chapter\n")
    .with_content("fast", "# Fast Chapter\n")
    .with_delay("slow", Duration::from_millis(500))
    .with_delay("fast", Duration::from_millis(50)),
  );
  let session = spawn_session(Arc::clone(&store), ScriptedEngine::instant());

  // Let the chapter list land; the slow first chapter starts loading.
  sleep(Duration::from_millis(10)).await;
  assert_eq!(session.snapshot().state, SessionState::Loading);

  session.select_chapter("fast");
  sleep(Duration::from_millis(600)).await;

  // The slow fetch resolved after the switch; its result must not surface.
  let snapshot = session.snapshot();
  assert_eq!(snapshot.state, SessionState::Displaying);
  assert_eq!(snapshot.displayed_chapter.as_deref(), Some("fast"));
  let document = snapshot.document.expect("document displayed");
  assert!(document.html.contains("Fast Chapter"));
  assert!(!document.html.contains("Slow Chapter"));
  assert_eq!(snapshot.toc.len(), 1);
  assert_eq!(snapshot.toc[0].anchor_id, "fast-chapter");
  assert_eq!(snapshot.scroll_epoch, 1);
}

#[tokio::test(start_paused = true)]
async fn reselecting_displayed_chapter_is_a_noop() {
  let store = Arc::new(
    ScriptedStore::new(vec![chapter("only", 1, "Only")])
      .with_content("only", "# Only\n"),
  );
  let session = spawn_session(Arc::clone(&store), ScriptedEngine::instant());

  sleep(Duration::from_millis(10)).await;
  assert_eq!(store.fetches(), 1);
  assert_eq!(session.snapshot().scroll_epoch, 1);

  session.select_chapter("only");
  sleep(Duration::from_millis(10)).await;

  assert_eq!(store.fetches(), 1, "reselect must not refetch");
  assert_eq!(session.snapshot().scroll_epoch, 1);
}

#[tokio::test(start_paused = true)]
async fn fetch_error_keeps_previous_document_and_retry_recovers() {
  let store = Arc::new(
    ScriptedStore::new(vec![
      chapter("good", 1, "Good"),
      chapter("flaky", 2, "Flaky"),
    ])
    .with_content("good", "# Good\n")
    .with_content("flaky", "# Flaky\n")
    .failing_fetches("flaky", 1),
  );
  let session = spawn_session(Arc::clone(&store), ScriptedEngine::instant());

  sleep(Duration::from_millis(10)).await;
  assert_eq!(session.snapshot().state, SessionState::Displaying);

  session.select_chapter("flaky");
  sleep(Duration::from_millis(10)).await;

  let snapshot = session.snapshot();
  assert_eq!(snapshot.state, SessionState::Error);
  assert!(snapshot.error.is_some());
  // The last good document stays on screen behind the error state.
  let document = snapshot.document.expect("previous document retained");
  assert_eq!(document.chapter_id, "good");
  assert_eq!(snapshot.scroll_epoch, 1);

  session.retry();
  sleep(Duration::from_millis(10)).await;

  let snapshot = session.snapshot();
  assert_eq!(snapshot.state, SessionState::Displaying);
  assert_eq!(snapshot.displayed_chapter.as_deref(), Some("flaky"));
  assert!(snapshot.error.is_none());
  assert_eq!(snapshot.scroll_epoch, 2);
}

#[tokio::test(start_paused = true)]
async fn empty_tutorial_settles_in_empty_state() {
  let store = Arc::new(ScriptedStore::new(Vec::new()));
  let session = spawn_session(Arc::clone(&store), ScriptedEngine::instant());

  sleep(Duration::from_millis(10)).await;
  let snapshot = session.snapshot();

  assert_eq!(snapshot.state, SessionState::Empty);
  assert!(snapshot.chapters.is_empty());
  assert!(snapshot.document.is_none());
  assert_eq!(store.fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn chapter_list_failure_is_retryable() {
  let store = Arc::new(
    ScriptedStore::new(vec![chapter("intro", 1, "Introduction")])
      .with_content("intro", "# Introduction\n")
      .failing_lists(1),
  );
  let session = spawn_session(Arc::clone(&store), ScriptedEngine::instant());

  sleep(Duration::from_millis(10)).await;
  let snapshot = session.snapshot();
  assert_eq!(snapshot.state, SessionState::Error);
  assert!(snapshot.chapters.is_empty());

  session.retry();
  sleep(Duration::from_millis(10)).await;

  let snapshot = session.snapshot();
  assert_eq!(snapshot.state, SessionState::Displaying);
  assert_eq!(snapshot.displayed_chapter.as_deref(), Some("intro"));
}

#[tokio::test(start_paused = true)]
async fn diagram_placeholder_is_swapped_in_place() {
  let markdown = "# Flow\n\n```mermaid\ngraph TD;\n```\n";
  let store = Arc::new(
    ScriptedStore::new(vec![chapter("flow", 1, "Flow")])
      .with_content("flow", markdown),
  );
  let session = spawn_session(
    Arc::clone(&store),
    ScriptedEngine {
      delay: Duration::from_millis(100),
    },
  );

  sleep(Duration::from_millis(10)).await;
  let snapshot = session.snapshot();
  assert_eq!(snapshot.state, SessionState::Displaying);
  let document = snapshot.document.expect("document displayed");
  assert!(document.html.contains("diagram-pending"));
  assert_eq!(snapshot.scroll_epoch, 1);

  sleep(Duration::from_millis(200)).await;
  let snapshot = session.snapshot();
  let document = snapshot.document.expect("document displayed");
  assert!(document.html.contains("<svg>graph TD;</svg>"));
  assert!(!document.html.contains("diagram-pending"));
  // The swap updates content in place; no scroll reset.
  assert_eq!(snapshot.scroll_epoch, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_diagram_degrades_without_touching_others() {
  let markdown =
    "# Mixed\n\n```mermaid\ngraph TD;\n```\n\n```mermaid\nfail here\n```\n";
  let store = Arc::new(
    ScriptedStore::new(vec![chapter("mixed", 1, "Mixed")])
      .with_content("mixed", markdown),
  );
  let session = spawn_session(Arc::clone(&store), ScriptedEngine::instant());

  sleep(Duration::from_millis(10)).await;
  let snapshot = session.snapshot();
  let document = snapshot.document.expect("document displayed");
  assert!(document.html.contains("<svg>graph TD;</svg>"));
  assert!(document.html.contains("diagram-error"));
  assert!(!document.html.contains("diagram-pending"));
}

#[tokio::test(start_paused = true)]
async fn diagram_for_displayed_document_lands_after_failed_selection() {
  let store = Arc::new(
    ScriptedStore::new(vec![
      chapter("diagrammed", 1, "Diagrammed"),
      chapter("flaky", 2, "Flaky"),
    ])
    .with_content("diagrammed", "# Diagrammed\n\n```mermaid\ngraph TD;\n```\n")
    .with_content("flaky", "# Flaky\n")
    .failing_fetches("flaky", 1),
  );
  let session = spawn_session(
    Arc::clone(&store),
    ScriptedEngine {
      delay: Duration::from_millis(200),
    },
  );

  sleep(Duration::from_millis(10)).await;
  assert_eq!(session.snapshot().state, SessionState::Displaying);

  // The failed selection leaves the first chapter's document on screen.
  session.select_chapter("flaky");
  sleep(Duration::from_millis(10)).await;
  assert_eq!(session.snapshot().state, SessionState::Error);

  // Its in-flight diagram still belongs to the displayed document and
  // must resolve the pending placeholder.
  sleep(Duration::from_millis(300)).await;
  let snapshot = session.snapshot();
  let document = snapshot.document.expect("document displayed");
  assert_eq!(document.chapter_id, "diagrammed");
  assert!(document.html.contains("<svg>graph TD;</svg>"));
  assert!(!document.html.contains("diagram-pending"));
}

#[tokio::test(start_paused = true)]
async fn stale_diagram_result_is_discarded() {
  let store = Arc::new(
    ScriptedStore::new(vec![
      chapter("diagrammed", 1, "Diagrammed"),
      chapter("plain", 2, "Plain"),
    ])
    .with_content("diagrammed", "# Diagrammed\n\n```mermaid\ngraph TD;\n```\n")
    .with_content("plain", "# Plain\n\nNo diagrams here.\n"),
  );
  let session = spawn_session(
    Arc::clone(&store),
    ScriptedEngine {
      delay: Duration::from_millis(300),
    },
  );

  sleep(Duration::from_millis(10)).await;
  assert!(
    session
      .snapshot()
      .document
      .expect("document displayed")
      .html
      .contains("diagram-pending")
  );

  // Switch away before the diagram settles.
  session.select_chapter("plain");
  sleep(Duration::from_millis(400)).await;

  let snapshot = session.snapshot();
  assert_eq!(snapshot.displayed_chapter.as_deref(), Some("plain"));
  let document = snapshot.document.expect("document displayed");
  assert!(!document.html.contains("data-diagram"));
  assert!(!document.html.contains("<svg>"));
}
