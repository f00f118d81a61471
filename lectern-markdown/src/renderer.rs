//! Document rendering: Markdown to a navigable HTML tree.
//!
//! The renderer drives the whole pipeline for one pass: it runs the heading
//! indexer over the raw source, parses the document with comrak, rewrites
//! fenced code blocks (diagram placeholders, highlighted copyable blocks) at
//! the AST level, and finally binds the indexer-assigned anchor ids onto the
//! rendered heading elements. It holds no per-document state and is safely
//! re-invokable: identical input produces byte-identical output.

use std::{collections::HashMap, sync::LazyLock};

use comrak::{
  Arena,
  nodes::{AstNode, NodeHtmlBlock, NodeValue},
  options::Options,
  parse_document,
};
use html_escape::{encode_double_quoted_attribute, encode_text};
use log::{debug, error};
use regex::Regex;

use crate::{
  anchors::index_headings,
  types::{Heading, RenderedDocument},
  utils::{binding_key, never_matching_regex},
};

/// Options for configuring the document renderer.
#[derive(Debug, Clone)]
pub struct RendererOptions {
  /// Enable GitHub Flavored Markdown extensions (tables, strikethrough,
  /// task lists, autolinks).
  pub gfm: bool,

  /// Enable syntax highlighting for non-diagram code blocks. When disabled
  /// (or when no grammar matches), blocks render as escaped plain text.
  pub highlight_code: bool,
}

impl Default for RendererOptions {
  fn default() -> Self {
    Self {
      gfm:            true,
      highlight_code: cfg!(feature = "highlight"),
    }
  }
}

/// Main document renderer. Cheap to clone, holds only options.
#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer {
  options: RendererOptions,
}

/// Pending placeholder markup for the diagram slot with the given key.
///
/// Emitted verbatim by the renderer for every diagram block; the session
/// later swaps it (all occurrences, so duplicate sources resolve together)
/// for [`diagram_success`] or [`diagram_failure`] markup.
#[must_use]
pub fn diagram_placeholder(key: usize) -> String {
  format!(
    "<div class=\"diagram diagram-pending\" data-diagram=\"{key}\"><p>Rendering diagram&hellip;</p></div>"
  )
}

/// Final markup for a successfully rendered diagram slot.
#[must_use]
pub fn diagram_success(key: usize, markup: &str) -> String {
  format!("<div class=\"diagram\" data-diagram=\"{key}\">{markup}</div>")
}

/// Placeholder markup for a diagram slot whose render failed.
#[must_use]
pub fn diagram_failure(key: usize) -> String {
  format!(
    "<div class=\"diagram diagram-error\" data-diagram=\"{key}\"><p>Diagram failed to render</p></div>"
  )
}

/// Collects distinct diagram sources for one pass, assigning each a stable
/// key in first-encounter order.
#[derive(Debug, Default)]
struct DiagramCollector {
  sources: Vec<String>,
  keys:    HashMap<String, usize>,
}

impl DiagramCollector {
  /// Key for the given source text, allocating a new slot on first sight.
  /// Sources are compared byte-for-byte, whitespace included.
  fn key_for(&mut self, source: &str) -> usize {
    if let Some(&key) = self.keys.get(source) {
      return key;
    }
    let key = self.sources.len();
    self.sources.push(source.to_string());
    self.keys.insert(source.to_string(), key);
    key
  }
}

impl DocumentRenderer {
  /// Create a new renderer with the given options.
  #[must_use]
  pub const fn new(options: RendererOptions) -> Self {
    Self { options }
  }

  /// Access renderer options.
  #[must_use]
  pub const fn options(&self) -> &RendererOptions {
    &self.options
  }

  /// Render one chapter's Markdown source into a navigable document.
  #[must_use]
  pub fn render(&self, markdown: &str) -> RenderedDocument {
    let headings = index_headings(markdown);
    let title = headings
      .iter()
      .find(|h| h.level == 1)
      .map(|h| h.text.clone());

    let arena = Arena::new();
    let options = self.comrak_options();
    let root = parse_document(&arena, markdown, &options);

    let mut diagrams = DiagramCollector::default();
    self.transform_code_blocks(root, &mut diagrams);

    let mut html = String::new();
    if let Err(e) = comrak::format_html(root, &options, &mut html) {
      error!("failed to format rendered document: {e}");
    }

    let html = bind_heading_anchors(&html, &headings);
    let html = label_unlabeled_images(&html);

    RenderedDocument {
      html,
      headings,
      title,
      diagram_sources: diagrams.sources,
    }
  }

  /// Render with panic containment: malformed input must degrade to a
  /// visible fallback document, never take down the caller.
  #[must_use]
  pub fn render_with_recovery(&self, markdown: &str) -> RenderedDocument {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      self.render(markdown)
    })) {
      Ok(result) => result,
      Err(panic_err) => {
        error!("panic during chapter rendering: {panic_err:?}");
        RenderedDocument {
          html: "<div class=\"error\">Critical error rendering chapter \
                 content</div>"
            .to_string(),

          headings:        Vec::new(),
          title:           None,
          diagram_sources: Vec::new(),
        }
      },
    }
  }

  /// Replace fenced code blocks with either a diagram placeholder (for
  /// `mermaid` fences) or a highlighted, copyable block.
  fn transform_code_blocks<'a>(
    &self,
    node: &'a AstNode<'a>,
    diagrams: &mut DiagramCollector,
  ) {
    for child in node.children() {
      let replacement = {
        let data = child.data.borrow();
        if let NodeValue::CodeBlock(ref block) = data.value {
          let language =
            block.info.split_whitespace().next().unwrap_or_default();
          if language == "mermaid" {
            let key = diagrams.key_for(&block.literal);
            Some(diagram_placeholder(key))
          } else {
            Some(self.render_code_block(&block.literal, language))
          }
        } else {
          None
        }
      };

      if let Some(html) = replacement {
        child.data.borrow_mut().value =
          NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 6,
            literal:    html,
          });
      }

      self.transform_code_blocks(child, diagrams);
    }
  }

  /// Render a non-diagram code block: highlighted `<pre><code>` wrapped
  /// with a copy button carrying the block's exact source text.
  fn render_code_block(&self, source: &str, language: &str) -> String {
    let language = if language.is_empty() { "text" } else { language };

    let body = if self.options.highlight_code {
      highlight::highlight_html(source, language)
        .unwrap_or_else(|| encode_text(source).to_string())
    } else {
      encode_text(source).to_string()
    };

    let copy_text = encode_double_quoted_attribute(source);
    format!(
      "<div class=\"codeblock\"><button type=\"button\" \
       class=\"copy-button\" data-copy-text=\"{copy_text}\" \
       aria-label=\"Copy code\">Copy</button><pre \
       class=\"highlight\"><code \
       class=\"language-{language}\">{body}</code></pre></div>"
    )
  }

  /// Build comrak options from `RendererOptions`.
  fn comrak_options(&self) -> Options<'_> {
    let mut options = Options::default();
    if self.options.gfm {
      options.extension.table = true;
      options.extension.strikethrough = true;
      options.extension.tasklist = true;
      options.extension.autolink = true;
      options.extension.footnotes = true;
    }
    options.render.r#unsafe = true;
    // Anchor ids are bound from the heading indexer, never re-derived here
    options.extension.header_ids = None;
    options
  }
}

static HEADING_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?s)<h([1-6])>(.*?)</h[1-6]>").unwrap_or_else(|e| {
    log::error!("failed to compile HEADING_ELEMENT_RE regex: {e}");
    never_matching_regex()
  })
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"<[^>]+>").unwrap_or_else(|e| {
    log::error!("failed to compile TAG_RE regex: {e}");
    never_matching_regex()
  })
});

static UNLABELED_IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"<img ([^>]*?)alt="""#).unwrap_or_else(|e| {
    log::error!("failed to compile UNLABELED_IMG_RE regex: {e}");
    never_matching_regex()
  })
});

/// Bind indexer-assigned anchor ids onto rendered heading elements.
///
/// Elements are matched against headings by normalized text and occurrence
/// order rather than by re-deriving the slug, so the TOC and the rendered
/// anchors cannot drift apart. An element with no matching heading (comrak
/// recognizes a few forms the raw scanner deliberately does not, setext
/// headings for one) is left without an id.
fn bind_heading_anchors(html: &str, headings: &[Heading]) -> String {
  let mut consumed = vec![false; headings.len()];
  let keys: Vec<String> =
    headings.iter().map(|h| binding_key(&h.text)).collect();

  let mut out = String::with_capacity(html.len());
  let mut last_end = 0;

  for caps in HEADING_ELEMENT_RE.captures_iter(html) {
    let Some(whole) = caps.get(0) else { continue };
    let level = &caps[1];
    let inner = &caps[2];

    out.push_str(&html[last_end..whole.start()]);
    last_end = whole.end();

    let inner_text = TAG_RE.replace_all(inner, "");
    let element_key =
      binding_key(&html_escape::decode_html_entities(&inner_text));

    let matched = keys
      .iter()
      .enumerate()
      .find(|(i, key)| !consumed[*i] && **key == element_key);

    if let Some((i, _)) = matched {
      consumed[i] = true;
      let id = &headings[i].id;
      out.push_str(&format!("<h{level} id=\"{id}\">{inner}</h{level}>"));
    } else {
      debug!("no anchor for rendered heading: {element_key:?}");
      out.push_str(whole.as_str());
    }
  }

  out.push_str(&html[last_end..]);
  out
}

/// Give images without alt text a generic fallback label.
fn label_unlabeled_images(html: &str) -> String {
  UNLABELED_IMG_RE
    .replace_all(html, r#"<img ${1}alt="image""#)
    .to_string()
}

#[cfg(feature = "highlight")]
mod highlight {
  //! Class-based syntax highlighting via syntect. Spans carry scope classes
  //! only; the actual colors come from the surrounding stylesheet.

  use std::sync::OnceLock;

  use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::SyntaxSet,
    util::LinesWithEndings,
  };

  fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
  }

  /// Highlight `code`, returning `None` when no grammar matches the
  /// language token (callers fall back to escaped plain text).
  pub fn highlight_html(code: &str, language: &str) -> Option<String> {
    let set = syntax_set();
    let syntax = set.find_syntax_by_token(language)?;

    let mut generator = ClassedHTMLGenerator::new_with_class_style(
      syntax,
      set,
      ClassStyle::Spaced,
    );
    for line in LinesWithEndings::from(code) {
      generator
        .parse_html_for_line_which_includes_newline(line)
        .ok()?;
    }
    Some(generator.finalize())
  }
}

#[cfg(not(feature = "highlight"))]
mod highlight {
  /// Highlighting is compiled out; callers fall back to escaped text.
  pub fn highlight_html(_code: &str, _language: &str) -> Option<String> {
    None
  }
}
