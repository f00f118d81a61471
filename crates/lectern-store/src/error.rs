use std::io;

use thiserror::Error;

/// Error type for content store operations.
///
/// Variants carry rendered messages rather than error sources so that they
/// stay `Clone`: session snapshots embed the failure for display and retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
  /// The tutorial, chapter list, or content record does not exist.
  #[error("not found: {0}")]
  NotFound(String),

  /// The store was reachable but the transfer failed.
  #[error("transport failure: {0}")]
  Transport(String),

  /// The payload exists but could not be decoded (malformed manifest,
  /// non-UTF-8 chapter text).
  #[error("content is not valid text: {0}")]
  Decode(String),
}

impl StoreError {
  /// Map an I/O error for the given locator into the store taxonomy.
  #[must_use]
  pub fn from_io(locator: &str, err: &io::Error) -> Self {
    match err.kind() {
      io::ErrorKind::NotFound => Self::NotFound(locator.to_string()),
      _ => Self::Transport(format!("{locator}: {err}")),
    }
  }
}
