use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line interface for lectern
#[derive(Parser, Debug)]
#[command(author, version, about = "Lectern: tutorial reader and site builder")]
pub struct Cli {
  /// Subcommand to execute (see [`Commands`])
  #[command(subcommand)]
  pub command: Commands,

  /// Enable verbose debug logging
  #[arg(short, long)]
  pub verbose: bool,
}

/// All supported subcommands for the lectern CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Render a tutorial to static HTML pages.
  Build {
    /// Root directory of the content store (one subdirectory per tutorial,
    /// each with a tutorial.toml manifest).
    #[arg(short, long, default_value = "content")]
    store: PathBuf,

    /// Identifier of the tutorial to render.
    tutorial: String,

    /// Output directory for generated pages.
    #[arg(short, long, default_value = "site")]
    output: PathBuf,

    /// Skip diagram rendering entirely.
    #[arg(long)]
    no_diagrams: bool,

    /// Mermaid CLI executable to invoke for diagram rendering.
    #[arg(long, default_value = lectern_diagram::mermaid::DEFAULT_COMMAND)]
    mermaid_command: String,
  },

  /// Serve a previously built site over HTTP.
  #[cfg(feature = "serve")]
  Serve {
    /// Directory containing the built site.
    #[arg(short, long, default_value = "site")]
    dir: PathBuf,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
  },
}

impl Cli {
  /// Parse command line arguments into a [`Cli`] struct.
  #[must_use]
  pub fn parse_args() -> Self {
    Self::parse()
  }
}
