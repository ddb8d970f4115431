//! HTTP Basic-auth layer over the whole API.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;

use oraculo_core::store::{CollectionStore, SnapshotRemote};

use crate::{AppState, error::ApiError};

/// Credentials accepted as valid for this server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify credentials directly from headers.
pub fn verify(headers: &HeaderMap, settings: &AuthSettings) -> Result<(), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != settings.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&settings.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(())
}

/// Middleware: reject unauthenticated requests when auth is configured.
/// A server without configured credentials runs open.
pub async fn require_auth<L, R>(
  State(state): State<AppState<L, R>>,
  request: Request,
  next: Next,
) -> Response
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  if let Some(settings) = &state.auth
    && let Err(rejection) = verify(request.headers(), settings)
  {
    return rejection.into_response();
  }
  next.run(request).await
}
