//! Error types for `oraculo-assistant`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("service returned {status}: {body}")]
  Service {
    status: reqwest::StatusCode,
    body:   String,
  },

  /// The service answered 200 but the payload misses what we asked for
  /// (e.g. no text part on an extraction response).
  #[error("malformed response: {0}")]
  Malformed(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
