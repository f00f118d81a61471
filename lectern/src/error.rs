use std::io;

use lectern_store::StoreError;
use thiserror::Error;

/// Error type for lectern build operations.
#[derive(Debug, Error)]
pub enum LecternError {
  #[error("content store error: {0}")]
  Store(#[from] StoreError),

  #[error("template error: {0}")]
  Template(#[from] tera::Error),

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}
