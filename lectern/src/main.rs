use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use lectern::{cli, html};
use lectern_diagram::mermaid::MermaidCli;
use lectern_markdown::{DocumentRenderer, RendererOptions};
use lectern_store::FsStore;
use log::LevelFilter;

fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = cli::Cli::parse_args();

  env_logger::Builder::new()
    .filter_level(if cli.verbose {
      LevelFilter::Debug
    } else {
      LevelFilter::Info
    })
    .write_style(env_logger::WriteStyle::Always)
    .init();

  let runtime = tokio::runtime::Runtime::new()
    .wrap_err("failed to start async runtime")?;

  match cli.command {
    cli::Commands::Build {
      store,
      tutorial,
      output,
      no_diagrams,
      mermaid_command,
    } => {
      let store = FsStore::new(store);
      let engine = Arc::new(MermaidCli::new(mermaid_command));
      let renderer = DocumentRenderer::new(RendererOptions::default());
      let options = html::BuildOptions {
        tutorial_id: tutorial,
        output_dir:  output,
        no_diagrams,
      };

      runtime
        .block_on(html::build(&store, &engine, &renderer, &options))
        .wrap_err("site build failed")?;
    },
    #[cfg(feature = "serve")]
    cli::Commands::Serve { dir, port } => {
      runtime.block_on(lectern::serve::serve(&dir, port))?;
    },
  }

  Ok(())
}
