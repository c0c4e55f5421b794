use std::net::SocketAddr;

use axum::{response::IntoResponse, routing::get, Router};
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod chain;
mod download;
mod error;
mod provider;
mod relay;
mod util;

pub use error::{Error, Result};

use download::AppState;
use util::LISTEN_PORT;

pub const PUBLIC_DIR: &str = "public";

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let app = router(AppState::new()?);
  let addr = SocketAddr::from(([0, 0, 0, 0], *LISTEN_PORT));

  info!("TikTok downloader app listening at http://localhost:{}", addr.port());

  axum::Server::try_bind(&addr)?
    .serve(app.into_make_service())
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  Ok(())
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/download", get(download::download))
    .route("/health", get(health))
    .fallback_service(ServeDir::new(PUBLIC_DIR))
    .with_state(state)
}

async fn health() -> impl IntoResponse {
  "OK"
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("failed to listen for shutdown signal: {}", e);
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}
