//! Static site generation: renders every chapter of a tutorial to HTML with
//! the chapter navigation and TOC baked in.
//!
//! This is the batch counterpart of the interactive session: diagram renders
//! still run concurrently per chapter, but the build awaits them and splices
//! the settled results into the output, so pages ship with no pending
//! placeholders.

pub mod template;

use std::{path::PathBuf, sync::Arc};

use lectern_diagram::{DiagramEngine, render_all};
use lectern_markdown::{
  DocumentRenderer,
  renderer::{diagram_failure, diagram_placeholder, diagram_success},
};
use lectern_store::ContentStore;
use log::{info, warn};

use crate::{
  error::LecternError,
  toc::navigation_index,
};

/// Options for a site build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Tutorial to render.
  pub tutorial_id: String,
  /// Output directory for generated pages.
  pub output_dir:  PathBuf,
  /// Skip diagram rendering, leaving pending placeholders in the output.
  pub no_diagrams: bool,
}

/// Render a whole tutorial to static pages.
///
/// # Errors
///
/// Fails on store, template, or output I/O errors. Individual diagram
/// failures degrade to inline placeholders and do not fail the build.
pub async fn build<S, E>(
  store: &S,
  engine: &Arc<E>,
  renderer: &DocumentRenderer,
  options: &BuildOptions,
) -> Result<(), LecternError>
where
  S: ContentStore,
  E: DiagramEngine + ?Sized + 'static,
{
  let info = store.tutorial_info(&options.tutorial_id).await?;
  let chapters = store.list_chapters(&options.tutorial_id).await?;

  tokio::fs::create_dir_all(&options.output_dir).await?;

  if chapters.is_empty() {
    // An empty tutorial is a valid (if unhelpful) structure, not a failure.
    warn!("tutorial {} has no chapters", options.tutorial_id);
    let page = format!(
      "<!DOCTYPE html><html><body><h1>{}</h1><p>This tutorial has no \
       chapters yet.</p></body></html>",
      html_escape::encode_text(&info.title)
    );
    tokio::fs::write(options.output_dir.join("index.html"), page).await?;
    return Ok(());
  }

  for chapter in &chapters {
    let markdown = store.fetch_content(&chapter.content_ref).await?;
    let doc = renderer.render_with_recovery(&markdown);

    let mut html = doc.html;
    if !options.no_diagrams && !doc.diagram_sources.is_empty() {
      let entries = render_all(engine, &doc.diagram_sources).await;
      for (key, entry) in entries.iter().enumerate() {
        let markup = match &entry.outcome {
          Ok(svg) => diagram_success(key, svg),
          Err(e) => {
            warn!(
              "diagram {key} in chapter {} failed: {e}",
              chapter.id
            );
            diagram_failure(key)
          },
        };
        html = html.replace(&diagram_placeholder(key), &markup);
      }
    }

    let toc = navigation_index(&doc.headings);
    let page = template::render_chapter_page(&template::ChapterPage {
      tutorial_title:  &info.title,
      chapter_title:   &chapter.title,
      current_chapter: &chapter.id,
      chapters:        &chapters,
      toc:             &toc,
      content:         &html,
    })?;

    let path = options.output_dir.join(format!("{}.html", chapter.id));
    tokio::fs::write(&path, page).await?;
    info!("wrote {}", path.display());
  }

  // index.html points at the first chapter, mirroring the session's
  // auto-selection.
  let redirect = format!(
    "<!DOCTYPE html><html><head><meta http-equiv=\"refresh\" \
     content=\"0; url={}.html\"></head></html>",
    chapters[0].id
  );
  tokio::fs::write(options.output_dir.join("index.html"), redirect).await?;

  Ok(())
}
