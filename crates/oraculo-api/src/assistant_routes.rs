//! Handlers for `/assistant` — the Maya gateway endpoints.
//!
//! Chat follows the transcript-first error policy: when the AI service
//! fails, the handler answers 200 with the canned apology so the
//! conversation keeps flowing; only a missing gateway configuration is a
//! real HTTP error.

use axum::{
  Json,
  extract::{Path, State},
  http::HeaderMap,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use oraculo_assistant::{
  Assistant, BidMetadata, ChatAttachment, history::ChatTurn,
  parse_status_updates, wire::{FunctionCall, GroundingChunk},
};
use oraculo_core::{
  audit::{AuditAction, AuditEntity},
  bid::BidStatus,
  store::{CollectionStore, SnapshotRemote},
};

use crate::{AppState, error::ApiError, record_audit, spawn_push};

/// What the UI shows when the service fails mid-conversation.
const APOLOGY: &str =
  "Maya teve um problema na sincronização de turnos. Pode repetir?";

fn gateway<L, R>(state: &AppState<L, R>) -> Result<&Assistant, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  state
    .assistant
    .as_ref()
    .ok_or_else(|| ApiError::Unavailable("assistant is not configured".to_string()))
}

// ─── Extraction ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractBody {
  pub base64:    String,
  pub mime_type: String,
}

/// `POST /assistant/extract` — structured field extraction from an uploaded
/// bid notice.
pub async fn extract<L, R>(
  State(state): State<AppState<L, R>>,
  Json(body): Json<ExtractBody>,
) -> Result<Json<BidMetadata>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let metadata = gateway(&state)?
    .extract_bid_metadata(&body.base64, &body.mime_type)
    .await
    .map_err(|e| ApiError::Upstream(e.to_string()))?;
  Ok(Json(metadata))
}

// ─── Chat ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatBody {
  pub message: String,
  #[serde(default)]
  pub history: Vec<ChatTurn>,
  #[serde(default)]
  pub attachment: Option<ChatAttachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedUpdate {
  pub bid_id: Uuid,
  pub status: BidStatus,
  pub title:  String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
  pub text: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub function_calls: Vec<FunctionCall>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub grounding: Vec<GroundingChunk>,
  /// Status updates the model requested and the server applied.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub applied: Vec<AppliedUpdate>,
}

/// `POST /assistant/chat`
pub async fn chat<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let reply = match gateway(&state)?
    .chat(&body.message, &body.history, body.attachment.as_ref())
    .await
  {
    Ok(reply) => reply,
    Err(e) => {
      tracing::warn!(error = %e, "assistant chat failed");
      return Ok(Json(ChatResponse {
        text:           APOLOGY.to_string(),
        function_calls: Vec::new(),
        grounding:      Vec::new(),
        applied:        Vec::new(),
      }));
    }
  };

  let applied = apply_status_updates(&state, &headers, &reply.function_calls).await?;

  Ok(Json(ChatResponse {
    text: reply.text,
    function_calls: reply.function_calls,
    grounding: reply.grounding,
    applied,
  }))
}

/// Apply every well-formed `update_bid_status` call to the store. Calls
/// naming unknown bids are ignored, matching the UI behaviour.
async fn apply_status_updates<L, R>(
  state: &AppState<L, R>,
  headers: &HeaderMap,
  calls: &[FunctionCall],
) -> Result<Vec<AppliedUpdate>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let updates = parse_status_updates(calls);
  if updates.is_empty() {
    return Ok(Vec::new());
  }

  let mut bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let mut applied = Vec::new();
  for update in updates {
    if let Some(bid) = bids.iter_mut().find(|b| b.id == update.bid_id) {
      bid.set_status(update.status, Utc::now());
      applied.push(AppliedUpdate {
        bid_id: bid.id,
        status: update.status,
        title:  bid.title.clone(),
      });
    }
  }

  if !applied.is_empty() {
    state
      .store
      .persist_bids(&bids)
      .await
      .map_err(ApiError::store)?;
    for update in &applied {
      record_audit(
        state,
        headers,
        AuditAction::Update,
        AuditEntity::Bid,
        &update.title,
      )
      .await?;
    }
    spawn_push(state);
  }

  Ok(applied)
}

// ─── Proposal ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProposalResponse {
  pub text: String,
}

/// `POST /assistant/proposal/{bid_id}` — draft a commercial proposal for
/// one bid.
pub async fn proposal<L, R>(
  State(state): State<AppState<L, R>>,
  Path(bid_id): Path<Uuid>,
) -> Result<Json<ProposalResponse>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let bid = bids
    .iter()
    .find(|b| b.id == bid_id)
    .ok_or_else(|| ApiError::NotFound(format!("bid {bid_id} not found")))?;

  let text = gateway(&state)?
    .draft_proposal(bid)
    .await
    .map_err(|e| ApiError::Upstream(e.to_string()))?;

  Ok(Json(ProposalResponse { text }))
}
