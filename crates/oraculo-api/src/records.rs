//! Handlers for the page-level collections: documents, products,
//! activities, the audit log, and the local-only knowledge base.
//!
//! Docs, products, and activities follow the original page-save semantics:
//! the client sends the whole collection back and every record is
//! re-stamped with one timestamp.

use axum::{
  Json,
  extract::State,
  http::HeaderMap,
};
use chrono::Utc;

use oraculo_core::{
  activity::Activity,
  audit::{AuditAction, AuditEntity, AuditLogEntry},
  doc::CompanyDocument,
  knowledge::KnowledgeDoc,
  product::Product,
  record::touch_all,
  store::{CollectionStore, SnapshotRemote},
};

use crate::{AppState, error::ApiError, record_audit, spawn_push};

// ─── Documents ────────────────────────────────────────────────────────────────

/// `GET /docs`
pub async fn list_docs<L, R>(
  State(state): State<AppState<L, R>>,
) -> Result<Json<Vec<CompanyDocument>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let docs = state.store.load_docs().await.map_err(ApiError::store)?;
  Ok(Json(docs))
}

/// `PUT /docs` — wholesale replacement, every record re-stamped.
pub async fn replace_docs<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Json(mut docs): Json<Vec<CompanyDocument>>,
) -> Result<Json<Vec<CompanyDocument>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  touch_all(&mut docs, Utc::now());
  state
    .store
    .persist_docs(&docs)
    .await
    .map_err(ApiError::store)?;

  record_audit(
    &state,
    &headers,
    AuditAction::Update,
    AuditEntity::Doc,
    "Documentação",
  )
  .await?;
  spawn_push(&state);

  Ok(Json(docs))
}

// ─── Products ─────────────────────────────────────────────────────────────────

/// `GET /products`
pub async fn list_products<L, R>(
  State(state): State<AppState<L, R>>,
) -> Result<Json<Vec<Product>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let products = state.store.load_products().await.map_err(ApiError::store)?;
  Ok(Json(products))
}

/// `PUT /products`
pub async fn replace_products<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Json(mut products): Json<Vec<Product>>,
) -> Result<Json<Vec<Product>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  touch_all(&mut products, Utc::now());
  state
    .store
    .persist_products(&products)
    .await
    .map_err(ApiError::store)?;

  record_audit(
    &state,
    &headers,
    AuditAction::Update,
    AuditEntity::Product,
    "Produtos",
  )
  .await?;
  spawn_push(&state);

  Ok(Json(products))
}

// ─── Activities ───────────────────────────────────────────────────────────────

/// `GET /activities`
pub async fn list_activities<L, R>(
  State(state): State<AppState<L, R>>,
) -> Result<Json<Vec<Activity>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let activities = state
    .store
    .load_activities()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(activities))
}

/// `PUT /activities`
pub async fn replace_activities<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Json(mut activities): Json<Vec<Activity>>,
) -> Result<Json<Vec<Activity>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  touch_all(&mut activities, Utc::now());
  state
    .store
    .persist_activities(&activities)
    .await
    .map_err(ApiError::store)?;

  record_audit(
    &state,
    &headers,
    AuditAction::Update,
    AuditEntity::Activity,
    "Atividades",
  )
  .await?;
  spawn_push(&state);

  Ok(Json(activities))
}

// ─── Audit log ────────────────────────────────────────────────────────────────

/// `GET /logs` — retention already applied by the store.
pub async fn list_logs<L, R>(
  State(state): State<AppState<L, R>>,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let logs = state.store.load_logs().await.map_err(ApiError::store)?;
  Ok(Json(logs))
}

// ─── Knowledge base ───────────────────────────────────────────────────────────

/// `GET /knowledge`
pub async fn list_knowledge<L, R>(
  State(state): State<AppState<L, R>>,
) -> Result<Json<Vec<KnowledgeDoc>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let docs = state.store.load_knowledge().await.map_err(ApiError::store)?;
  Ok(Json(docs))
}

/// `PUT /knowledge` — local-only: no audit entry, no cloud push.
pub async fn replace_knowledge<L, R>(
  State(state): State<AppState<L, R>>,
  Json(docs): Json<Vec<KnowledgeDoc>>,
) -> Result<Json<Vec<KnowledgeDoc>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  state
    .store
    .persist_knowledge(&docs)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(docs))
}
