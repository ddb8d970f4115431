//! Handlers for `/bids` — the central CRUD surface.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/bids` | Optional `?q=<text>&status=<label>` |
//! | `POST`   | `/bids` | Upsert by id; 201 when the bid is new |
//! | `GET`    | `/bids/{id}` | 404 if not found |
//! | `DELETE` | `/bids/{id}` | Immediate, no tombstone |
//! | `POST`   | `/bids/{id}/items` | Upsert one item by id |
//! | `DELETE` | `/bids/{id}/items/{item_id}` | |
//! | `POST`   | `/bids/{id}/status` | Body: `{"status":"<label>"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use oraculo_core::{
  audit::{AuditAction, AuditEntity},
  bid::{Bid, BidItem, BidStatus, remove_bid, upsert_bid},
  store::{CollectionStore, SnapshotRemote},
};

use crate::{AppState, error::ApiError, record_audit, spawn_push};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Free-text filter over title, bidding number, and organ.
  pub q:      Option<String>,
  pub status: Option<BidStatus>,
}

/// `GET /bids[?q=<text>&status=<label>]`
pub async fn list<L, R>(
  State(state): State<AppState<L, R>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Bid>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let term = params
    .q
    .as_deref()
    .map(|t| t.trim().to_lowercase())
    .filter(|t| !t.is_empty());

  let filtered = bids
    .into_iter()
    .filter(|bid| {
      let matches_term = term.as_deref().is_none_or(|t| {
        bid.title.to_lowercase().contains(t)
          || bid.bidding_number.to_lowercase().contains(t)
          || bid.organ.to_lowercase().contains(t)
      });
      let matches_status = params.status.is_none_or(|s| bid.status == s);
      matches_term && matches_status
    })
    .collect();

  Ok(Json(filtered))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /bids/{id}`
pub async fn get_one<L, R>(
  State(state): State<AppState<L, R>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Bid>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let bid = bids
    .into_iter()
    .find(|b| b.id == id)
    .ok_or_else(|| ApiError::NotFound(format!("bid {id} not found")))?;
  Ok(Json(bid))
}

// ─── Save ─────────────────────────────────────────────────────────────────────

/// `POST /bids` — upsert by id.
pub async fn save<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Json(bid): Json<Bid>,
) -> Result<impl IntoResponse, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let id = bid.id;
  let title = bid.title.clone();
  let mut bids = state.store.load_bids().await.map_err(ApiError::store)?;

  let existed = upsert_bid(&mut bids, bid, Utc::now());
  state
    .store
    .persist_bids(&bids)
    .await
    .map_err(ApiError::store)?;

  let action = if existed { AuditAction::Update } else { AuditAction::Create };
  record_audit(&state, &headers, action, AuditEntity::Bid, &title).await?;
  spawn_push(&state);

  let saved = bids
    .into_iter()
    .find(|b| b.id == id)
    .ok_or_else(|| ApiError::NotFound(format!("bid {id} not found")))?;
  let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
  Ok((status, Json(saved)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /bids/{id}` — immediate removal; the next sync propagates the
/// absence to the cloud.
pub async fn delete<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let mut bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let removed = remove_bid(&mut bids, id)
    .ok_or_else(|| ApiError::NotFound(format!("bid {id} not found")))?;

  state
    .store
    .persist_bids(&bids)
    .await
    .map_err(ApiError::store)?;

  record_audit(
    &state,
    &headers,
    AuditAction::Delete,
    AuditEntity::Bid,
    &removed.title,
  )
  .await?;
  spawn_push(&state);

  Ok(StatusCode::NO_CONTENT)
}

// ─── Items ────────────────────────────────────────────────────────────────────

/// `POST /bids/{id}/items` — upsert one item.
pub async fn upsert_item<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Path(id): Path<Uuid>,
  Json(item): Json<BidItem>,
) -> Result<Json<Bid>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let mut bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let bid = bids
    .iter_mut()
    .find(|b| b.id == id)
    .ok_or_else(|| ApiError::NotFound(format!("bid {id} not found")))?;

  bid.upsert_item(item, Utc::now());
  let saved = bid.clone();
  state
    .store
    .persist_bids(&bids)
    .await
    .map_err(ApiError::store)?;

  record_audit(
    &state,
    &headers,
    AuditAction::Update,
    AuditEntity::Bid,
    &format!("Item editado em: {}", saved.title),
  )
  .await?;
  spawn_push(&state);

  Ok(Json(saved))
}

/// `DELETE /bids/{id}/items/{item_id}`
pub async fn remove_item<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Bid>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let mut bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let bid = bids
    .iter_mut()
    .find(|b| b.id == id)
    .ok_or_else(|| ApiError::NotFound(format!("bid {id} not found")))?;

  if !bid.remove_item(item_id, Utc::now()) {
    return Err(ApiError::NotFound(format!("item {item_id} not found")));
  }
  let saved = bid.clone();
  state
    .store
    .persist_bids(&bids)
    .await
    .map_err(ApiError::store)?;

  record_audit(
    &state,
    &headers,
    AuditAction::Update,
    AuditEntity::Bid,
    &format!("Item removido de: {}", saved.title),
  )
  .await?;
  spawn_push(&state);

  Ok(Json(saved))
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
  pub status: BidStatus,
}

/// `POST /bids/{id}/status` — shared by the UI and the assistant's
/// function-call path.
pub async fn set_status<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Path(id): Path<Uuid>,
  Json(body): Json<SetStatusBody>,
) -> Result<Json<Bid>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let mut bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let bid = bids
    .iter_mut()
    .find(|b| b.id == id)
    .ok_or_else(|| ApiError::NotFound(format!("bid {id} not found")))?;

  bid.set_status(body.status, Utc::now());
  let saved = bid.clone();
  state
    .store
    .persist_bids(&bids)
    .await
    .map_err(ApiError::store)?;

  record_audit(
    &state,
    &headers,
    AuditAction::Update,
    AuditEntity::Bid,
    &saved.title,
  )
  .await?;
  spawn_push(&state);

  Ok(Json(saved))
}
