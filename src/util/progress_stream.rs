use std::{
  pin::Pin,
  task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use tracing::{debug, error, info, warn};

use crate::{Error, Result};

/// Byte accounting for one download.
#[derive(Debug, Default)]
pub struct Progress {
  downloaded: u64,
  // None when upstream declared no (or a zero) length
  total: Option<u64>,
}

impl Progress {
  pub fn new(total: Option<u64>) -> Self {
    Progress {
      downloaded: 0,
      total: total.filter(|&n| n > 0),
    }
  }

  /// Records a chunk and returns the percentage complete, if the total is
  /// known. Rounds down, so 100 is only reported once every byte arrived.
  pub fn advance(&mut self, bytes: usize) -> Option<u64> {
    self.downloaded += bytes as u64;
    self.total.map(|total| self.downloaded * 100 / total)
  }

  pub fn downloaded(&self) -> u64 {
    self.downloaded
  }

  pub fn is_complete(&self) -> bool {
    self.total.is_some_and(|total| self.downloaded >= total)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Streaming,
  // every byte arrived: upstream ended or the declared length was reached
  Done,
  Failed,
}

/// Wraps the upstream body on its way to the client: logs progress per
/// chunk, logs completion, and decides how a failure is reported depending
/// on whether the response headers already went out.
pub struct ProgressStream<T> {
  stream: T,
  progress: Progress,
  state: State,
  headers_committed: bool,
  completion_logged: bool,
}

impl<T> ProgressStream<T> {
  pub fn new(stream: T, total: Option<u64>) -> Self {
    ProgressStream {
      stream,
      progress: Progress::new(total),
      state: State::Streaming,
      headers_committed: false,
      completion_logged: false,
    }
  }

  /// Marks the point after which the status code can no longer change.
  pub fn commit_headers(&mut self) {
    self.headers_committed = true;
  }

  // Only a response that actually went out can have completed.
  fn log_completion(&mut self) {
    if self.state != State::Done
      || !self.headers_committed
      || self.completion_logged
    {
      return;
    }

    self.completion_logged = true;
    info!(
      "download completed successfully ({} bytes)",
      self.progress.downloaded()
    );
  }
}

impl<T> Stream for ProgressStream<T>
where
  T: Stream<Item = Result<Bytes>> + Unpin,
{
  type Item = Result<Bytes>;

  fn poll_next(
    mut self: Pin<&mut Self>,
    cx: &mut Context<'_>,
  ) -> Poll<Option<Self::Item>> {
    let this = &mut *self;
    if this.state != State::Streaming {
      this.log_completion();
      return Poll::Ready(None);
    }

    match Pin::new(&mut this.stream).poll_next(cx) {
      Poll::Ready(Some(Ok(bytes))) => {
        match this.progress.advance(bytes.len()) {
          Some(percent) => info!("download progress: {}%", percent),
          None => debug!("downloaded {} bytes", this.progress.downloaded()),
        }

        // hyper stops polling once it has sent Content-Length bytes, so the
        // end of the upstream body may never be observed
        if this.progress.is_complete() {
          this.state = State::Done;
          this.log_completion();
        }
        Poll::Ready(Some(Ok(bytes)))
      }
      Poll::Ready(Some(Err(err))) => {
        this.state = State::Failed;
        if this.headers_committed {
          // the status is on the wire already, all we can do is cut the body
          error!(
            "stream error after {} bytes, aborting client stream: {}",
            this.progress.downloaded(),
            err
          );
        } else {
          error!("stream error before response was sent: {}", err);
        }
        Poll::Ready(Some(Err(Error::Stream(Box::new(err)))))
      }
      Poll::Ready(None) => {
        this.state = State::Done;
        this.log_completion();
        Poll::Ready(None)
      }
      Poll::Pending => Poll::Pending,
    }
  }
}

impl<T> Drop for ProgressStream<T> {
  fn drop(&mut self) {
    if !self.headers_committed {
      return;
    }

    match self.state {
      // dropping the inner stream closes the upstream connection
      State::Streaming => warn!(
        "client disconnected after {} bytes, upstream download aborted",
        self.progress.downloaded()
      ),
      State::Done => self.log_completion(),
      State::Failed => {}
    }
  }
}
