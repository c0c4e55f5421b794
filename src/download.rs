use std::sync::Arc;

use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::info;

use crate::{
  chain::ResolutionChain,
  provider::{self, Provider, VideoRequest},
  relay::{Download, Relay},
  Result,
};

#[derive(Clone)]
pub struct AppState {
  chain: ResolutionChain,
  relay: Relay,
}

impl AppState {
  pub fn new() -> Result<Self> {
    let providers = provider::default_providers()?;
    Ok(Self::with_providers(providers, Relay::new()?))
  }

  pub fn with_providers(
    providers: Vec<Arc<dyn Provider>>,
    relay: Relay,
  ) -> Self {
    Self {
      chain: ResolutionChain::new(providers),
      relay,
    }
  }
}

#[derive(Deserialize)]
pub struct DownloadReq {
  url: Option<String>,
}

#[axum::debug_handler]
pub async fn download(
  State(state): State<AppState>,
  Query(req): Query<DownloadReq>,
) -> Result<Download> {
  let video = VideoRequest::new(req.url)?;
  let media = state.chain.resolve_first(&video).await?;
  let download = state.relay.fetch(media).await?;

  info!("sending {}", download.filename());
  Ok(download)
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use axum::{http::header, routing::get, Router};
  use reqwest::StatusCode;

  use super::*;
  use crate::{
    error::{DOWNLOAD_FAILED_MESSAGE, MISSING_URL_MESSAGE},
    provider::test::Fixed,
    router,
    util::test::{capture_logs, spawn_server, wait_for_log},
  };

  fn serve(providers: &[Arc<Fixed>]) -> String {
    let providers = providers
      .iter()
      .map(|p| p.clone() as Arc<dyn Provider>)
      .collect();
    let state = AppState::with_providers(providers, Relay::new().unwrap());
    spawn_server(router(state))
  }

  fn video_upstream() -> String {
    let app = Router::new()
      .route(
        "/video.mp4",
        get(|| async {
          ([(header::CONTENT_TYPE, "video/mp4")], vec![1u8; 1000])
        }),
      )
      .route(
        "/page",
        get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html/>") }),
      );
    spawn_server(app)
  }

  #[tokio::test]
  async fn test_missing_url() {
    let provider = Arc::new(Fixed::new("a", Some("http://unused")));
    let base = serve(&[provider.clone()]);

    for path in ["/download", "/download?url=", "/download?other=1"] {
      let resp = reqwest::get(format!("{base}{path}")).await.unwrap();
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
      assert_eq!(resp.text().await.unwrap(), MISSING_URL_MESSAGE);
    }

    // rejected before any provider got involved
    assert_eq!(provider.calls(), 0);
  }

  #[tokio::test]
  async fn test_all_providers_fail() {
    let providers = [
      Arc::new(Fixed::new("a", None)),
      Arc::new(Fixed::new("b", None)),
    ];
    let base = serve(&providers);

    let resp = reqwest::get(format!("{base}/download?url=https://t/1"))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.text().await.unwrap(), DOWNLOAD_FAILED_MESSAGE);

    for p in &providers {
      assert_eq!(p.calls(), 1);
    }
  }

  #[tokio::test]
  async fn test_download() {
    let upstream = video_upstream();
    let media_url = format!("{upstream}/video.mp4");
    let providers = [
      Arc::new(Fixed::new("a", None)),
      Arc::new(Fixed::new("b", Some(&media_url))),
    ];
    let base = serve(&providers);

    let resp = reqwest::Client::new()
      .get(format!("{base}/download"))
      .query(&[("url", "https://www.tiktok.com/@a/video/1")])
      .send()
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "video/mp4");
    let disposition = resp.headers()[header::CONTENT_DISPOSITION]
      .to_str()
      .unwrap()
      .to_owned();
    assert!(disposition.starts_with("attachment; filename=\"tiktok_video_"));
    assert!(disposition.ends_with(".mp4\""));

    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len(), 1000);
  }

  #[tokio::test]
  async fn test_download_logs_completion_once() {
    let (logs, _guard) = capture_logs();
    let upstream = video_upstream();
    let media_url = format!("{upstream}/video.mp4");
    let base = serve(&[Arc::new(Fixed::new("a", Some(&media_url)))]);

    let resp = reqwest::get(format!("{base}/download?url=https://t/1"))
      .await
      .unwrap();
    assert_eq!(resp.headers()[header::CONTENT_LENGTH], "1000");
    assert_eq!(resp.bytes().await.unwrap().len(), 1000);

    // the server drops the body on its own schedule once it is written
    wait_for_log(&logs, "download completed successfully (1000 bytes)").await;
    assert_eq!(logs.count("download progress: 100%"), 1);
    assert_eq!(logs.count("download completed successfully"), 1);
    assert_eq!(logs.count("client disconnected"), 0);
  }

  #[tokio::test]
  async fn test_resolved_url_is_not_a_video() {
    let upstream = video_upstream();
    let page_url = format!("{upstream}/page");
    let base = serve(&[Arc::new(Fixed::new("a", Some(&page_url)))]);

    let resp = reqwest::get(format!("{base}/download?url=https://t/1"))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp
      .headers()
      .get(header::CONTENT_DISPOSITION)
      .is_none());
    assert_eq!(resp.text().await.unwrap(), DOWNLOAD_FAILED_MESSAGE);
  }

  #[tokio::test]
  async fn test_health() {
    let base = serve(&[]);
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");
  }
}
