//! Development server for a built site, gated behind the `serve` feature.

use std::{net::SocketAddr, path::Path};

use axum::Router;
use color_eyre::eyre::{Context, Result};
use log::info;
use tower_http::services::ServeDir;

/// Serve `dir` over HTTP until interrupted.
///
/// # Errors
///
/// Fails if the listener cannot bind or the server terminates abnormally.
pub async fn serve(dir: &Path, port: u16) -> Result<()> {
  let app = Router::new().fallback_service(ServeDir::new(dir));

  let addr = SocketAddr::from(([127, 0, 0, 1], port));
  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .wrap_err_with(|| format!("failed to bind {addr}"))?;

  info!("serving {} at http://{addr}/", dir.display());
  axum::serve(listener, app)
    .await
    .wrap_err("HTTP server terminated")?;

  Ok(())
}
