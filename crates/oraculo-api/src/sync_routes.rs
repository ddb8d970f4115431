//! Handlers for `/sync` and `/backup`.
//!
//! Push results are reports, not errors: a rejected push (busy, offline,
//! conflict) answers 200 with the outcome in the body, exactly as the UI
//! surfaces them as transient badges rather than failures.

use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use oraculo_core::{
  audit::{AuditAction, AuditEntity},
  store::{CollectionStore, SnapshotRemote},
};
use oraculo_sync::{PushOutcome, SyncState, backup, backup::ImportMode};

use crate::{AppState, error::ApiError, record_audit, spawn_push};

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
  pub state: SyncState,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_remote_update: Option<DateTime<Utc>>,
}

/// `GET /sync/status`
pub async fn status<L, R>(
  State(state): State<AppState<L, R>>,
) -> Json<StatusResponse>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  Json(StatusResponse {
    state:              state.engine.state(),
    last_remote_update: state.engine.last_remote_update(),
  })
}

// ─── Push ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum PushReport {
  Completed { timestamp: DateTime<Utc> },
  Busy,
  Offline,
  Conflict,
  Failed { error: String },
}

/// `POST /sync/push` — one attempt, never queued.
pub async fn push<L, R>(State(state): State<AppState<L, R>>) -> Json<PushReport>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let report = match state.engine.push().await {
    PushOutcome::Completed { timestamp } => PushReport::Completed { timestamp },
    PushOutcome::Busy => PushReport::Busy,
    PushOutcome::Offline => PushReport::Offline,
    PushOutcome::Conflict => PushReport::Conflict,
    PushOutcome::Failed(error) => PushReport::Failed { error },
  };
  Json(report)
}

// ─── Refresh ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
  /// Whether a remote snapshot existed and was merged in.
  pub merged: bool,
  pub state:  SyncState,
}

/// `POST /sync/refresh` — the user-triggered forced pull+merge.
pub async fn refresh<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let merged = state
    .engine
    .sync_from_remote()
    .await
    .map_err(ApiError::store)?;

  if merged {
    record_audit(
      &state,
      &headers,
      AuditAction::Sync,
      AuditEntity::Finance,
      "Cloud Forçada",
    )
    .await?;
  }

  Ok(Json(RefreshResponse { merged, state: state.engine.state() }))
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// `GET /backup/export` — the downloadable backup file.
pub async fn export<L, R>(
  State(state): State<AppState<L, R>>,
) -> Result<Response, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let snapshot = state
    .store
    .load_snapshot()
    .await
    .map_err(ApiError::store)?;
  let now = Utc::now();
  let file = backup::export(&snapshot, now);
  let body = backup::to_pretty_json(&file)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let disposition = format!(
    "attachment; filename=\"{}\"",
    backup::suggested_filename(now)
  );
  Ok(
    (
      StatusCode::OK,
      [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      body,
    )
      .into_response(),
  )
}

// ─── Import ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImportParams {
  /// `replace` (restore) or `merge` — always explicit, never defaulted.
  pub mode: ImportMode,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
  pub bids:       usize,
  pub docs:       usize,
  pub products:   usize,
  pub activities: usize,
  pub logs:       usize,
}

/// `POST /backup/import?mode=replace|merge` — body is the backup JSON.
/// Malformed input aborts the whole import; nothing is partially applied.
pub async fn import<L, R>(
  State(state): State<AppState<L, R>>,
  Query(params): Query<ImportParams>,
  body: String,
) -> Result<Json<ImportResponse>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let file = backup::parse(&body)
    .map_err(|e| ApiError::BadRequest(format!("invalid backup file: {e}")))?;

  let snapshot = backup::apply(state.store.as_ref(), &file, params.mode, Utc::now())
    .await
    .map_err(ApiError::store)?;

  spawn_push(&state);

  Ok(Json(ImportResponse {
    bids:       snapshot.bids.len(),
    docs:       snapshot.docs.len(),
    products:   snapshot.products.len(),
    activities: snapshot.activities.len(),
    logs:       snapshot.logs.len(),
  }))
}
