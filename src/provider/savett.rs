use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header;

use crate::Result;

use super::{browser_headers, non_empty, send_checked, Provider, VideoRequest};

const ENDPOINT: &str = "https://savett.cc/download";
const SITE: &str = "https://savett.cc";

static DOWNLOAD_LINK_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"href="([^"]+)">Download MP4</a>"#).unwrap());

// POSTs the video url as a form and scrapes the download page it returns.
pub struct SaveTt {
  client: reqwest::Client,
  endpoint: String,
}

impl SaveTt {
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
impl Provider for SaveTt {
  fn name(&self) -> &'static str {
    "savett"
  }

  async fn lookup(&self, video: &VideoRequest) -> Result<Option<String>> {
    let req = self
      .client
      .post(&self.endpoint)
      .form(&[("url", video.as_str())])
      .header(header::ACCEPT, "*/*");

    let html = send_checked(browser_headers(req, SITE))
      .await?
      .text()
      .await?;

    Ok(download_link(&html))
  }
}

fn download_link(html: &str) -> Option<String> {
  let caps = DOWNLOAD_LINK_REGEX.captures(html)?;
  non_empty(caps.get(1).map(|m| m.as_str()))
}
