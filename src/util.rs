use std::sync::LazyLock;

mod progress_stream;

pub use progress_stream::ProgressStream;

pub const DEFAULT_PORT: u16 = 3006;

// listening port, overridable with the PORT environment variable
pub static LISTEN_PORT: LazyLock<u16> = LazyLock::new(|| {
  std::env::var("PORT")
    .ok()
    .and_then(|s| s.parse::<u16>().ok())
    .unwrap_or(DEFAULT_PORT)
});

// how much of an upstream error body ends up in the logs
pub const ERROR_BODY_LIMIT: usize = 512;

/// Cuts `s` down to at most `limit` bytes on a char boundary, marking the
/// cut with an ellipsis.
pub fn truncate(mut s: String, limit: usize) -> String {
  if s.len() <= limit {
    return s;
  }

  let mut end = limit;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  s.truncate(end);
  s.push('…');
  s
}
