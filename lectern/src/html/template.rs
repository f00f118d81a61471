//! Chapter page templating.

use lectern_store::Chapter;
use tera::Tera;

use crate::toc::TocEntry;

/// Built-in chapter page template.
pub const CHAPTER_TEMPLATE: &str =
  include_str!("../../templates/chapter.html");

/// Everything a chapter page needs from the build pipeline.
#[derive(Debug)]
pub struct ChapterPage<'a> {
  pub tutorial_title:  &'a str,
  pub chapter_title:   &'a str,
  pub current_chapter: &'a str,
  pub chapters:        &'a [Chapter],
  pub toc:             &'a [TocEntry],
  pub content:         &'a str,
}

/// Render one chapter page.
///
/// # Errors
///
/// Returns an error if the template cannot be parsed or rendered.
pub fn render_chapter_page(page: &ChapterPage<'_>) -> tera::Result<String> {
  let mut tera = Tera::default();
  tera.add_raw_template("chapter", CHAPTER_TEMPLATE)?;

  let mut context = tera::Context::new();
  context.insert("tutorial_title", page.tutorial_title);
  context.insert("chapter_title", page.chapter_title);
  context.insert("current_chapter", page.current_chapter);
  context.insert("chapters", page.chapters);
  context.insert("toc", page.toc);
  context.insert("content", page.content);

  tera.render("chapter", &context)
}
