use axum::response::{IntoResponse, Response};
use reqwest::StatusCode;
use tracing::error;

pub const MISSING_URL_MESSAGE: &str = "Please provide a TikTok video URL";
pub const DOWNLOAD_FAILED_MESSAGE: &str =
  "Error downloading video. Please make sure the video URL is valid and try again.";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("missing video url")]
  MissingUrl,
  #[error("failed to get video url from all providers")]
  NoProviderSucceeded,
  #[error("invalid content type received: {0:?}")]
  InvalidContentType(Option<String>),
  #[error("upstream responded with {status}: {body}")]
  UpstreamStatus { status: StatusCode, body: String },
  #[error("timed out after {0:?}")]
  Timeout(std::time::Duration),
  #[error("stream error: {0}")]
  Stream(#[source] Box<Error>),
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

impl Error {
  pub fn status_code(&self) -> StatusCode {
    match self {
      Error::MissingUrl => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status_code();
    if status.is_server_error() {
      error!("download error: {}", self);
    }

    // upstream detail stays in the logs
    let message = match self {
      Error::MissingUrl => MISSING_URL_MESSAGE,
      _ => DOWNLOAD_FAILED_MESSAGE,
    };

    (status, message).into_response()
  }
}
