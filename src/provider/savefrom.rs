use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;

use crate::Result;

use super::{
  browser_headers, non_empty, send_checked, Provider, VideoRequest,
  BROWSER_ACCEPT_LANGUAGE,
};

const ENDPOINT: &str = "https://api.savefrom.net/api/convert";
const SITE: &str = "https://savefrom.net";

// GET api/convert?url=<video>, answers with {"url": [{"url": "..."}, ...]}
pub struct SaveFrom {
  client: reqwest::Client,
  endpoint: String,
}

impl SaveFrom {
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
impl Provider for SaveFrom {
  fn name(&self) -> &'static str {
    "savefrom"
  }

  async fn lookup(&self, video: &VideoRequest) -> Result<Option<String>> {
    let req = self
      .client
      .get(&self.endpoint)
      .query(&[("url", video.as_str())])
      .header(header::ACCEPT, "application/json")
      .header(header::ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE);

    let body: Value = send_checked(browser_headers(req, SITE))
      .await?
      .json()
      .await?;

    Ok(first_link(&body))
  }
}

fn first_link(body: &Value) -> Option<String> {
  non_empty(body.pointer("/url/0/url").and_then(Value::as_str))
}
