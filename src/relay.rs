use std::time::Duration;

use axum::{
  body::StreamBody,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{stream::BoxStream, Stream, StreamExt};
use http::{header, HeaderValue};
use tracing::info;

use crate::{
  chain::ResolvedMedia,
  provider::{BROWSER_ACCEPT_LANGUAGE, BROWSER_USER_AGENT},
  util::{truncate, ProgressStream, ERROR_BODY_LIMIT},
  Error, Result,
};

// connect, response headers, and every body read
pub const MEDIA_DEADLINE: Duration = Duration::from_secs(30);
pub const MAX_REDIRECTS: usize = 5;

const MEDIA_ACCEPT: &str = "video/mp4,video/*;q=0.9,*/*;q=0.8";

type Body = ProgressStream<BoxStream<'static, Result<Bytes>>>;

/// Fetches a resolved media url and hands its body over to the client.
#[derive(Clone)]
pub struct Relay {
  client: reqwest::Client,
  deadline: Duration,
}

impl Relay {
  pub fn new() -> Result<Self> {
    Self::with_deadline(MEDIA_DEADLINE)
  }

  pub fn with_deadline(deadline: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
      .connect_timeout(deadline)
      .build()?;

    Ok(Self { client, deadline })
  }

  /// Everything that can still turn into an error status happens here.
  /// Once this returns a `Download`, only the body is left to send.
  pub async fn fetch(&self, media: ResolvedMedia) -> Result<Download> {
    info!(provider = media.provider, "downloading video from {}", media.url);

    let req = self
      .client
      .get(&media.url)
      .header(header::USER_AGENT, BROWSER_USER_AGENT)
      .header(header::ACCEPT, MEDIA_ACCEPT)
      .header(header::ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE);

    let resp = tokio::time::timeout(self.deadline, req.send())
      .await
      .map_err(|_| Error::Timeout(self.deadline))??;

    let status = resp.status();
    // 3xx left over after following redirects passes on purpose
    if !(200..400).contains(&status.as_u16()) {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::UpstreamStatus {
        status,
        body: truncate(body, ERROR_BODY_LIMIT),
      });
    }

    let content_type = resp
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned);
    let content_type = match content_type {
      Some(ct) if ct.contains("video") => ct,
      other => return Err(Error::InvalidContentType(other)),
    };

    let content_length = resp
      .headers()
      .get(header::CONTENT_LENGTH)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.parse::<u64>().ok());

    let stream = with_read_deadline(resp.bytes_stream(), self.deadline);
    let mut body = ProgressStream::new(stream, content_length);

    // a failure on the first read can still become a 500
    let first = body.next().await.transpose()?;

    Ok(Download {
      content_type,
      content_length,
      filename: download_filename(),
      first,
      body,
    })
  }
}

/// A validated upstream response, ready to be relayed.
pub struct Download {
  content_type: String,
  content_length: Option<u64>,
  filename: String,
  first: Option<Bytes>,
  body: Body,
}

impl Download {
  pub fn filename(&self) -> &str {
    &self.filename
  }
}

impl IntoResponse for Download {
  fn into_response(self) -> Response {
    let Download {
      content_type,
      content_length,
      filename,
      first,
      mut body,
    } = self;

    body.commit_headers();
    let stream = futures::stream::iter(first.map(Ok)).chain(body);

    let mut resp = (
      [
        (header::CONTENT_TYPE, content_type),
        (
          header::CONTENT_DISPOSITION,
          format!("attachment; filename=\"{filename}\""),
        ),
      ],
      StreamBody::new(stream),
    )
      .into_response();

    if let Some(len) = content_length {
      resp
        .headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    resp
  }
}

pub fn download_filename() -> String {
  format!("tiktok_video_{}.mp4", chrono::Utc::now().timestamp_millis())
}

// Ends the stream with a timeout error when upstream goes quiet for longer
// than `deadline` between two chunks.
fn with_read_deadline<S>(
  stream: S,
  deadline: Duration,
) -> BoxStream<'static, Result<Bytes>>
where
  S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
  futures::stream::unfold(Some(stream.boxed()), move |state| async move {
    let mut stream = state?;
    match tokio::time::timeout(deadline, stream.next()).await {
      Ok(Some(Ok(bytes))) => Some((Ok(bytes), Some(stream))),
      Ok(Some(Err(e))) => Some((Err(Error::Http(e)), None)),
      Ok(None) => None,
      Err(_) => Some((Err(Error::Timeout(deadline)), None)),
    }
  })
  .boxed()
}
