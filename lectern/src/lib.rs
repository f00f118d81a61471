//! Lectern turns a directory of Markdown tutorials into navigable documents,
//! either as a static site or through an interactive [`session::ChapterSession`]
//! that tracks chapter selection, rendering, and asynchronous diagram
//! completion.

pub mod cli;
pub mod copy;
pub mod error;
pub mod html;
#[cfg(feature = "serve")]
pub mod serve;
pub mod session;
pub mod toc;

pub use error::LecternError;
pub use session::{ChapterSession, SessionSnapshot, SessionState};
pub use toc::{TocEntry, navigation_index};
