mod savefrom;
mod savett;
mod ttsave;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{header, RequestBuilder, Response};
use tracing::{info, warn};

use crate::{
  util::{truncate, ERROR_BODY_LIMIT},
  Error, Result,
};

pub use savefrom::SaveFrom;
pub use savett::SaveTt;
pub use ttsave::TtSave;

pub const BROWSER_USER_AGENT: &str =
  "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

// upper bound for a single provider attempt
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(20);

/// The page url of the video a client asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest(String);

impl VideoRequest {
  pub fn new(url: Option<String>) -> Result<Self> {
    match url {
      Some(url) if !url.trim().is_empty() => Ok(Self(url)),
      _ => Err(Error::MissingUrl),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// One third-party service able to turn a video page url into a direct
/// media url.
#[async_trait]
pub trait Provider: Send + Sync {
  fn name(&self) -> &'static str;

  /// `Ok(None)` means the service answered but had no media url for us.
  async fn lookup(&self, video: &VideoRequest) -> Result<Option<String>>;

  async fn resolve(&self, video: &VideoRequest) -> Option<String> {
    match self.lookup(video).await {
      Ok(Some(url)) => Some(url),
      Ok(None) => {
        info!(provider = self.name(), "no video url in response");
        None
      }
      Err(e) => {
        warn!(provider = self.name(), "error with provider: {}", e);
        None
      }
    }
  }
}

/// The default provider list, in the order they are tried.
pub fn default_providers() -> Result<Vec<Arc<dyn Provider>>> {
  let client = provider_client()?;

  Ok(vec![
    Arc::new(SaveFrom::new(client.clone())),
    Arc::new(SaveTt::new(client.clone())),
    Arc::new(TtSave::new(client)),
  ])
}

pub fn provider_client() -> Result<reqwest::Client> {
  let client = reqwest::Client::builder()
    .timeout(PROVIDER_TIMEOUT)
    .build()?;
  Ok(client)
}

// Origin and Referer headers every provider sends, as if the request came
// from the service's own web page.
fn browser_headers(req: RequestBuilder, site: &str) -> RequestBuilder {
  req
    .header(header::USER_AGENT, BROWSER_USER_AGENT)
    .header(header::ORIGIN, site)
    .header(header::REFERER, format!("{site}/"))
}

async fn send_checked(req: RequestBuilder) -> Result<Response> {
  let resp = req.send().await?;
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }

  let body = resp.text().await.unwrap_or_default();
  Err(Error::UpstreamStatus {
    status,
    body: truncate(body, ERROR_BODY_LIMIT),
  })
}

fn non_empty(s: Option<&str>) -> Option<String> {
  s.filter(|s| !s.is_empty()).map(str::to_owned)
}
