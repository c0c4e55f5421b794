use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

use crate::Result;

use super::{
  browser_headers, non_empty, send_checked, Provider, VideoRequest,
  BROWSER_ACCEPT_LANGUAGE,
};

const ENDPOINT: &str = "https://ttsave.app/download";
const SITE: &str = "https://ttsave.app";

pub struct TtSave {
  client: reqwest::Client,
  endpoint: String,
}

#[derive(Deserialize)]
struct TtSaveResp {
  download_url: Option<String>,
}

impl TtSave {
  pub fn new(client: reqwest::Client) -> Self {
    Self::with_endpoint(client, ENDPOINT)
  }

  pub fn with_endpoint(client: reqwest::Client, endpoint: &str) -> Self {
    Self {
      client,
      endpoint: endpoint.to_owned(),
    }
  }
}

#[async_trait]
impl Provider for TtSave {
  fn name(&self) -> &'static str {
    "ttsave"
  }

  async fn lookup(&self, video: &VideoRequest) -> Result<Option<String>> {
    let req = self
      .client
      .get(&self.endpoint)
      .query(&[("mode", "video"), ("url", video.as_str())])
      .header(header::ACCEPT, "application/json")
      .header(header::ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE);

    let resp: TtSaveResp = send_checked(browser_headers(req, SITE))
      .await?
      .json()
      .await?;

    Ok(non_empty(resp.download_url.as_deref()))
  }
}
