//! Error types for `oraculo-sync`.

use thiserror::Error;

/// Remote object-store adapter errors.
#[derive(Debug, Error)]
pub enum Error {
  /// Missing or expired session. Treated as "offline mode" by the engine,
  /// never surfaced as a failure.
  #[error("unauthorized")]
  Unauthorized,

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("unexpected status {status} from {url}")]
  Status {
    status: reqwest::StatusCode,
    url:    String,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
