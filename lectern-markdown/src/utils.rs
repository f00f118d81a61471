//! Shared helpers: slug derivation, fence tracking, and text normalization.

use regex::Regex;

/// Derive the canonical (possibly colliding) anchor slug for a heading.
///
/// Lowercases the text, strips every character that is not a word character,
/// whitespace, or hyphen, then collapses whitespace runs to single hyphens.
/// May return an empty string for headings made only of punctuation; callers
/// are expected to substitute a positional fallback.
#[must_use]
pub fn slugify(text: &str) -> String {
  let lowered = text.to_lowercase();
  let stripped: String = lowered
    .chars()
    .filter(|c| {
      c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace()
    })
    .collect();

  stripped.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Reduce inline Markdown markup in heading text to its visible form.
///
/// Link and image syntax collapses to its label, code/emphasis delimiters
/// are dropped, and whitespace runs are collapsed. Underscores survive, so
/// identifiers like `snake_case` stay readable.
#[must_use]
pub fn clean_inline(text: &str) -> String {
  use std::sync::LazyLock;

  static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap_or_else(|e| {
      log::error!("failed to compile IMAGE_RE regex: {e}");
      never_matching_regex()
    })
  });
  static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap_or_else(|e| {
      log::error!("failed to compile LINK_RE regex: {e}");
      never_matching_regex()
    })
  });

  let without_images = IMAGE_RE.replace_all(text, "$1");
  let without_links = LINK_RE.replace_all(&without_images, "$1");

  let plain: String = without_links
    .chars()
    .filter(|c| !matches!(c, '`' | '*' | '~'))
    .collect();

  plain.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize heading text for matching an indexed heading against the text
/// content of its rendered element.
///
/// Built on [`clean_inline`], then case-folded with the remaining emphasis
/// punctuation dropped. The same normalization is applied to both sides of
/// the comparison, so it only has to be consistent, not lossless.
#[must_use]
pub fn binding_key(text: &str) -> String {
  clean_inline(text)
    .chars()
    .filter(|c| !matches!(c, '_' | '^'))
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// A regex that can never match anything. Used as a fallback when a static
/// pattern unexpectedly fails to compile.
#[must_use]
pub fn never_matching_regex() -> Regex {
  #[allow(
    clippy::expect_used,
    reason = "This pattern is guaranteed to be valid"
  )]
  Regex::new(r"[^\s\S]").expect("regex pattern [^\\s\\S] should always compile")
}

/// State tracking for code fence detection in markdown.
///
/// Tracks whether the scanner is currently inside a fenced code block and
/// remembers the fence character and count for proper closing detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FenceTracker {
  in_code_block:    bool,
  code_fence_char:  Option<char>,
  code_fence_count: usize,
}

impl FenceTracker {
  /// Create a new fence tracker.
  #[must_use]
  pub const fn new() -> Self {
    Self {
      in_code_block:    false,
      code_fence_char:  None,
      code_fence_count: 0,
    }
  }

  /// Check if currently inside a code block.
  #[must_use]
  pub const fn in_code_block(&self) -> bool {
    self.in_code_block
  }

  /// Process a line and return the updated fence state.
  ///
  /// Call this for each line to maintain accurate fence tracking.
  #[must_use]
  pub fn process_line(&self, line: &str) -> Self {
    let trimmed = line.trim_start();

    // Check for code fences (``` or ~~~)
    if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
      let Some(fence_char) = trimmed.chars().next() else {
        return *self;
      };

      let fence_count =
        trimmed.chars().take_while(|&c| c == fence_char).count();

      if fence_count >= 3 {
        if !self.in_code_block {
          return Self {
            in_code_block:    true,
            code_fence_char:  Some(fence_char),
            code_fence_count: fence_count,
          };
        } else if self.code_fence_char == Some(fence_char)
          && fence_count >= self.code_fence_count
        {
          return Self {
            in_code_block:    false,
            code_fence_char:  None,
            code_fence_count: 0,
          };
        }
      }
    }

    *self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugify_basic() {
    assert_eq!(slugify("Getting Started"), "getting-started");
    assert_eq!(slugify("What's New?"), "whats-new");
    assert_eq!(slugify("CLI   usage"), "cli-usage");
  }

  #[test]
  fn slugify_keeps_hyphens_and_underscores() {
    assert_eq!(slugify("nix-env and snake_case"), "nix-env-and-snake_case");
  }

  #[test]
  fn slugify_punctuation_only_is_empty() {
    assert_eq!(slugify("!?!"), "");
    assert_eq!(slugify("..."), "");
  }

  #[test]
  fn clean_inline_reduces_markup_to_visible_text() {
    assert_eq!(clean_inline("Install with `nix-env`"), "Install with nix-env");
    assert_eq!(clean_inline("See [the docs](https://x)"), "See the docs");
    assert_eq!(clean_inline("![logo](l.png) Welcome"), "logo Welcome");
    assert_eq!(clean_inline("keep snake_case"), "keep snake_case");
  }

  #[test]
  fn binding_key_strips_inline_markup() {
    assert_eq!(binding_key("Install with `nix-env`"), "install with nix-env");
    assert_eq!(binding_key("See [the docs](https://x)"), "see the docs");
    assert_eq!(binding_key("**Bold** and *em*"), "bold and em");
  }

  #[test]
  fn fence_tracker_toggles() {
    let t = FenceTracker::new();
    assert!(!t.in_code_block());
    let t = t.process_line("```rust");
    assert!(t.in_code_block());
    let t = t.process_line("# not a heading");
    assert!(t.in_code_block());
    let t = t.process_line("```");
    assert!(!t.in_code_block());
  }

  #[test]
  fn fence_tracker_requires_matching_char() {
    let t = FenceTracker::new().process_line("~~~");
    assert!(t.in_code_block());
    // A backtick fence does not close a tilde fence
    let t = t.process_line("```");
    assert!(t.in_code_block());
    let t = t.process_line("~~~");
    assert!(!t.in_code_block());
  }
}
