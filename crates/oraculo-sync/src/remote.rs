//! Remote snapshot store implementations.
//!
//! [`HttpRemote`] talks to the backing object-store service; [`MemoryRemote`]
//! keeps everything in process for tests and offline development.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use oraculo_core::{
  snapshot::Snapshot,
  store::{RemotePointer, RemoteSnapshot, SnapshotRemote},
};

use crate::{Error, Result};

/// Name of the per-user snapshot file inside the bucket.
const STATE_FILE: &str = "oraculo_state.json";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for the remote snapshot store.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  pub base_url: String,
  /// Object-store bucket holding the snapshot files.
  pub bucket:   String,
  /// The authenticated user; owns exactly one snapshot file.
  pub user_id:  String,
  /// Bearer token for the session.
  pub token:    String,
}

// ─── HTTP remote ─────────────────────────────────────────────────────────────

/// Object + pointer-row adapter over the backing HTTP storage service.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpRemote {
  client: Client,
  config: RemoteConfig,
}

/// Pointer-row wire shape.
#[derive(Debug, Serialize, Deserialize)]
struct PointerRow {
  file_url:   String,
  updated_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  digest:     Option<String>,
}

impl HttpRemote {
  pub fn new(config: RemoteConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, config })
  }

  /// Object path within the bucket: `{user_id}/oraculo_state.json`.
  fn object_path(&self) -> String {
    format!("{}/{STATE_FILE}", self.config.user_id)
  }

  fn object_url(&self, path: &str) -> String {
    format!(
      "{}/v1/objects/{}/{path}",
      self.config.base_url.trim_end_matches('/'),
      self.config.bucket
    )
  }

  fn pointer_url(&self) -> String {
    format!(
      "{}/v1/backup/{}",
      self.config.base_url.trim_end_matches('/'),
      self.config.user_id
    )
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req.bearer_auth(&self.config.token)
  }

  /// Map a non-success status to the adapter error taxonomy.
  fn check(status: StatusCode, url: &str) -> Result<()> {
    if status.is_success() {
      return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      return Err(Error::Unauthorized);
    }
    Err(Error::Status { status, url: url.to_string() })
  }

  async fn read_pointer(&self) -> Result<Option<PointerRow>> {
    let url = self.pointer_url();
    let resp = self.auth(self.client.get(&url)).send().await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    Self::check(resp.status(), &url)?;
    Ok(Some(resp.json().await?))
  }
}

impl SnapshotRemote for HttpRemote {
  type Error = Error;

  async fn head(&self) -> Result<Option<RemotePointer>> {
    Ok(self.read_pointer().await?.map(|row| RemotePointer {
      path:       row.file_url,
      updated_at: row.updated_at,
      digest:     row.digest,
    }))
  }

  async fn fetch(&self) -> Result<Option<RemoteSnapshot>> {
    let Some(row) = self.read_pointer().await? else {
      return Ok(None);
    };

    let url = self.object_url(&row.file_url);
    let resp = self.auth(self.client.get(&url)).send().await?;
    if resp.status() == StatusCode::NOT_FOUND {
      // A dangling pointer row counts as "no snapshot yet".
      return Ok(None);
    }
    Self::check(resp.status(), &url)?;

    let snapshot: Snapshot = resp.json().await?;
    Ok(Some(RemoteSnapshot { snapshot, updated_at: row.updated_at }))
  }

  async fn push(
    &self,
    snapshot: &Snapshot,
    pushed_at: DateTime<Utc>,
  ) -> Result<RemotePointer> {
    let path = self.object_path();
    let payload = serde_json::to_string(snapshot)?;
    let digest = hex::encode(Sha256::digest(payload.as_bytes()));

    let url = self.object_url(&path);
    let resp = self
      .auth(self.client.put(&url))
      .header(reqwest::header::CONTENT_TYPE, "application/json")
      .body(payload)
      .send()
      .await?;
    Self::check(resp.status(), &url)?;

    let row = PointerRow {
      file_url:   path.clone(),
      updated_at: pushed_at,
      digest:     Some(digest.clone()),
    };
    let url = self.pointer_url();
    let resp = self.auth(self.client.put(&url)).json(&row).send().await?;
    Self::check(resp.status(), &url)?;

    Ok(RemotePointer {
      path,
      updated_at: pushed_at,
      digest: Some(digest),
    })
  }

  fn is_auth_error(error: &Error) -> bool {
    matches!(error, Error::Unauthorized)
  }
}

// ─── Memory remote ───────────────────────────────────────────────────────────

/// Error type for [`MemoryRemote`].
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
  #[error("unauthorized")]
  Unauthorized,
}

#[derive(Default)]
struct MemoryState {
  stored: Option<(Snapshot, DateTime<Utc>)>,
}

/// In-process remote — the test double, mirroring the store crate's
/// `open_in_memory` idiom.
#[derive(Default)]
pub struct MemoryRemote {
  state:        std::sync::Mutex<MemoryState>,
  unauthorized: std::sync::atomic::AtomicBool,
  push_delay:   Option<Duration>,
}

impl MemoryRemote {
  pub fn new() -> Self {
    Self::default()
  }

  /// Sleep inside `push` — lets tests hold the single-flight guard open.
  pub fn with_push_delay(mut self, delay: Duration) -> Self {
    self.push_delay = Some(delay);
    self
  }

  /// Pretend the session expired: every call now fails with an auth error.
  pub fn set_unauthorized(&self, value: bool) {
    self
      .unauthorized
      .store(value, std::sync::atomic::Ordering::SeqCst);
  }

  /// Plant a remote snapshot as if a prior push had stored it.
  pub fn seed(&self, snapshot: Snapshot, updated_at: DateTime<Utc>) {
    self.lock().stored = Some((snapshot, updated_at));
  }

  /// The currently stored snapshot, if any.
  pub fn stored(&self) -> Option<(Snapshot, DateTime<Utc>)> {
    self.lock().stored.clone()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn gate(&self) -> Result<(), MemoryError> {
    if self.unauthorized.load(std::sync::atomic::Ordering::SeqCst) {
      Err(MemoryError::Unauthorized)
    } else {
      Ok(())
    }
  }
}

impl SnapshotRemote for MemoryRemote {
  type Error = MemoryError;

  async fn head(&self) -> Result<Option<RemotePointer>, MemoryError> {
    self.gate()?;
    Ok(self.lock().stored.as_ref().map(|(_, at)| RemotePointer {
      path:       STATE_FILE.to_string(),
      updated_at: *at,
      digest:     None,
    }))
  }

  async fn fetch(&self) -> Result<Option<RemoteSnapshot>, MemoryError> {
    self.gate()?;
    Ok(
      self
        .lock()
        .stored
        .clone()
        .map(|(snapshot, updated_at)| RemoteSnapshot { snapshot, updated_at }),
    )
  }

  async fn push(
    &self,
    snapshot: &Snapshot,
    pushed_at: DateTime<Utc>,
  ) -> Result<RemotePointer, MemoryError> {
    self.gate()?;
    if let Some(delay) = self.push_delay {
      tokio::time::sleep(delay).await;
    }
    self.lock().stored = Some((snapshot.clone(), pushed_at));
    Ok(RemotePointer {
      path:       STATE_FILE.to_string(),
      updated_at: pushed_at,
      digest:     None,
    })
  }

  fn is_auth_error(error: &MemoryError) -> bool {
    matches!(error, MemoryError::Unauthorized)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
  };

  use super::*;

  fn config(server: &MockServer) -> RemoteConfig {
    RemoteConfig {
      base_url: server.uri(),
      bucket:   "backup-files".to_string(),
      user_id:  "user-1".to_string(),
      token:    "session-token".to_string(),
    }
  }

  fn pointer_body(updated_at: &str) -> serde_json::Value {
    serde_json::json!({
      "file_url": "user-1/oraculo_state.json",
      "updated_at": updated_at,
    })
  }

  #[tokio::test]
  async fn head_returns_none_when_no_pointer_exists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/v1/backup/user-1"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&server)
      .await;

    let remote = HttpRemote::new(config(&server)).unwrap();
    assert!(remote.head().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn fetch_downloads_the_file_the_pointer_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/v1/backup/user-1"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(pointer_body("2024-06-01T10:00:00Z")),
      )
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/v1/objects/backup-files/user-1/oraculo_state.json"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "bids": [], "docs": [], "products": [], "activities": [], "logs": []
      })))
      .mount(&server)
      .await;

    let remote = HttpRemote::new(config(&server)).unwrap();
    let fetched = remote.fetch().await.unwrap().unwrap();

    assert!(fetched.snapshot.is_empty());
    assert_eq!(
      fetched.updated_at,
      "2024-06-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
    );
  }

  #[tokio::test]
  async fn push_uploads_object_then_moves_the_pointer() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/v1/objects/backup-files/user-1/oraculo_state.json"))
      .respond_with(ResponseTemplate::new(200))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("PUT"))
      .and(path("/v1/backup/user-1"))
      .respond_with(ResponseTemplate::new(200))
      .expect(1)
      .mount(&server)
      .await;

    let remote = HttpRemote::new(config(&server)).unwrap();
    let pushed_at = Utc::now();
    let pointer = remote.push(&Snapshot::default(), pushed_at).await.unwrap();

    assert_eq!(pointer.path, "user-1/oraculo_state.json");
    assert_eq!(pointer.updated_at, pushed_at);
    // Digest of the serialized payload travels with the pointer.
    assert_eq!(pointer.digest.as_deref().map(str::len), Some(64));
  }

  #[tokio::test]
  async fn expired_session_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/v1/backup/user-1"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&server)
      .await;

    let remote = HttpRemote::new(config(&server)).unwrap();
    let err = remote.head().await.unwrap_err();

    assert!(matches!(err, Error::Unauthorized));
    assert!(HttpRemote::is_auth_error(&err));
  }

  #[tokio::test]
  async fn server_errors_keep_their_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/v1/backup/user-1"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let remote = HttpRemote::new(config(&server)).unwrap();
    let err = remote.head().await.unwrap_err();

    assert!(matches!(err, Error::Status { status, .. } if status.as_u16() == 500));
  }
}
