//! Mermaid CLI engine.
//!
//! Shells out to the `mmdc` mermaid command-line renderer: the source is
//! written to a scratch file, rendered to SVG, and the SVG is read back.
//! Requires `mmdc` (or a compatible binary) on `PATH`; a missing binary
//! surfaces as [`DiagramError::Engine`] per diagram, which the pipeline
//! degrades to an inline placeholder.

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

use crate::{DiagramEngine, DiagramError};

/// Default mermaid CLI binary name.
pub const DEFAULT_COMMAND: &str = "mmdc";

/// Engine backed by the mermaid CLI.
#[derive(Debug, Clone)]
pub struct MermaidCli {
  command: String,
}

impl Default for MermaidCli {
  fn default() -> Self {
    Self::new(DEFAULT_COMMAND)
  }
}

impl MermaidCli {
  /// Use a specific binary name or path instead of `mmdc`.
  #[must_use]
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
    }
  }
}

#[async_trait]
impl DiagramEngine for MermaidCli {
  async fn render_diagram(
    &self,
    source: &str,
  ) -> Result<String, DiagramError> {
    let dir = tempfile::tempdir()
      .map_err(|e| DiagramError::Engine(format!("scratch dir: {e}")))?;
    let input = dir.path().join("diagram.mmd");
    let output = dir.path().join("diagram.svg");

    tokio::fs::write(&input, source)
      .await
      .map_err(|e| DiagramError::Engine(format!("write source: {e}")))?;

    debug!("rendering diagram via {}", self.command);
    let result = Command::new(&self.command)
      .arg("--input")
      .arg(&input)
      .arg("--output")
      .arg(&output)
      .output()
      .await
      .map_err(|e| {
        DiagramError::Engine(format!("spawn {}: {e}", self.command))
      })?;

    if !result.status.success() {
      let stderr = String::from_utf8_lossy(&result.stderr);
      return Err(classify_failure(&stderr));
    }

    tokio::fs::read_to_string(&output)
      .await
      .map_err(|e| DiagramError::Engine(format!("read svg: {e}")))
  }
}

/// Split CLI failures into source errors and engine errors. mmdc reports
/// malformed input with a parser message on stderr.
fn classify_failure(stderr: &str) -> DiagramError {
  let lowered = stderr.to_lowercase();
  if lowered.contains("parse error") || lowered.contains("syntax error") {
    DiagramError::Syntax(first_line(stderr))
  } else {
    DiagramError::Engine(first_line(stderr))
  }
}

fn first_line(text: &str) -> String {
  text
    .lines()
    .find(|l| !l.trim().is_empty())
    .unwrap_or("renderer failed with no output")
    .trim()
    .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_errors_map_to_syntax() {
    let err = classify_failure("Parse error on line 2:\n...");
    assert!(matches!(err, DiagramError::Syntax(_)));
    assert_eq!(err.to_string(), "diagram syntax error: Parse error on line 2:");
  }

  #[test]
  fn other_failures_map_to_engine() {
    let err = classify_failure("puppeteer: chromium not found");
    assert!(matches!(err, DiagramError::Engine(_)));
  }

  #[test]
  fn empty_stderr_still_produces_a_message() {
    let err = classify_failure("");
    assert_eq!(
      err,
      DiagramError::Engine("renderer failed with no output".to_string())
    );
  }
}
