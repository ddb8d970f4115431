//! JSON REST API for the Oráculo bid tracker.
//!
//! Exposes an axum [`Router`] over any [`CollectionStore`] +
//! [`SnapshotRemote`] pair. Every mutating handler records an audit entry
//! and fires a best-effort background push — the server-side rendition of
//! "every state change schedules a cloud backup". TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new().nest("/api", oraculo_api::api_router(state))
//! ```

pub mod assistant_routes;
pub mod auth;
pub mod bids;
pub mod error;
pub mod finance;
pub mod records;
pub mod sync_routes;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  http::HeaderMap,
  middleware,
  routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

use oraculo_assistant::{Assistant, AssistantConfig};
use oraculo_core::{
  audit::{self, AuditAction, AuditEntity, AuditLogEntry},
  store::{CollectionStore, SnapshotRemote},
};
use oraculo_sync::{PushOutcome, RemoteConfig, SyncEngine};

pub use auth::AuthSettings;
pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Actor recorded in the audit log when no `x-operator` header is sent.
  #[serde(default = "default_operator")]
  pub default_operator: String,
  /// Absent ⇒ the server runs open.
  #[serde(default)]
  pub auth: Option<AuthSettings>,
  /// Absent ⇒ offline mode: cloud sync becomes a no-op.
  #[serde(default)]
  pub remote: Option<RemoteConfig>,
  /// Absent ⇒ assistant endpoints answer 503.
  #[serde(default)]
  pub assistant: Option<AssistantConfig>,
}

fn default_operator() -> String {
  "Marcos".to_string()
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<L, R> {
  pub store:  Arc<L>,
  pub engine: Arc<SyncEngine<L, R>>,
  pub assistant: Option<Assistant>,
  pub auth: Option<Arc<AuthSettings>>,
  pub default_operator: String,
}

impl<L, R> Clone for AppState<L, R> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      engine: self.engine.clone(),
      assistant: self.assistant.clone(),
      auth: self.auth.clone(),
      default_operator: self.default_operator.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn api_router<L, R>(state: AppState<L, R>) -> Router<()>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  Router::new()
    // Bids
    .route("/bids", get(bids::list::<L, R>).post(bids::save::<L, R>))
    .route(
      "/bids/{id}",
      get(bids::get_one::<L, R>).delete(bids::delete::<L, R>),
    )
    .route("/bids/{id}/items", post(bids::upsert_item::<L, R>))
    .route(
      "/bids/{id}/items/{item_id}",
      axum::routing::delete(bids::remove_item::<L, R>),
    )
    .route("/bids/{id}/status", post(bids::set_status::<L, R>))
    // Page-level collections
    .route(
      "/docs",
      get(records::list_docs::<L, R>).put(records::replace_docs::<L, R>),
    )
    .route(
      "/products",
      get(records::list_products::<L, R>).put(records::replace_products::<L, R>),
    )
    .route(
      "/activities",
      get(records::list_activities::<L, R>)
        .put(records::replace_activities::<L, R>),
    )
    .route("/logs", get(records::list_logs::<L, R>))
    .route(
      "/knowledge",
      get(records::list_knowledge::<L, R>)
        .put(records::replace_knowledge::<L, R>),
    )
    // Finance
    .route("/finance/summary", get(finance::summary::<L, R>))
    .route("/finance/report/{year}", get(finance::report::<L, R>))
    // Sync + backup
    .route("/sync/status", get(sync_routes::status::<L, R>))
    .route("/sync/push", post(sync_routes::push::<L, R>))
    .route("/sync/refresh", post(sync_routes::refresh::<L, R>))
    .route("/backup/export", get(sync_routes::export::<L, R>))
    .route("/backup/import", post(sync_routes::import::<L, R>))
    // Assistant
    .route("/assistant/extract", post(assistant_routes::extract::<L, R>))
    .route("/assistant/chat", post(assistant_routes::chat::<L, R>))
    .route(
      "/assistant/proposal/{bid_id}",
      post(assistant_routes::proposal::<L, R>),
    )
    .layer(middleware::from_fn_with_state(
      state.clone(),
      auth::require_auth::<L, R>,
    ))
    .with_state(state)
}

// ─── Handler helpers ──────────────────────────────────────────────────────────

/// Actor for the audit trail: the `x-operator` header when present, the
/// configured default otherwise.
pub(crate) fn operator<L, R>(state: &AppState<L, R>, headers: &HeaderMap) -> String {
  headers
    .get("x-operator")
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_string)
    .unwrap_or_else(|| state.default_operator.clone())
}

/// Append one audit entry (retention applied) to the store.
pub(crate) async fn record_audit<L, R>(
  state: &AppState<L, R>,
  headers: &HeaderMap,
  action: AuditAction,
  entity: AuditEntity,
  name: &str,
) -> Result<(), ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let actor = operator(state, headers);
  let now = Utc::now();
  let logs = state.store.load_logs().await.map_err(ApiError::store)?;
  let next = audit::record(
    logs,
    AuditLogEntry::new(actor, action, entity, name, now),
    now,
  );
  state
    .store
    .persist_logs(&next)
    .await
    .map_err(ApiError::store)
}

/// Fire a best-effort push after a mutation. Never blocks the response;
/// rejected or failed attempts are only logged — the next mutation is the
/// retry.
pub(crate) fn spawn_push<L, R>(state: &AppState<L, R>)
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let engine = state.engine.clone();
  tokio::spawn(async move {
    match engine.push().await {
      PushOutcome::Completed { timestamp } => {
        tracing::debug!(%timestamp, "after-mutation push completed");
      }
      outcome => {
        tracing::debug!(?outcome, "after-mutation push not applied");
      }
    }
  });
}

// ─── Integration tests ────────────────────────────────────────────────────────
