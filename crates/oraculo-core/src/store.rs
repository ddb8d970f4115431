//! Storage traits: the local collection store and the remote snapshot store.
//!
//! Implemented by `oraculo-store-sqlite` and `oraculo-sync`. Higher layers
//! depend on these abstractions, not on a concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  activity::Activity, audit::AuditLogEntry, bid::Bid, doc::CompanyDocument,
  knowledge::KnowledgeDoc, product::Product, snapshot::Snapshot,
};

// ─── Local store ─────────────────────────────────────────────────────────────

/// The on-device store: one named JSON collection per business area.
///
/// Loads of a collection that was never persisted return the empty
/// collection. Implementations apply the audit-retention rule on **both**
/// the log load and the log persist path, so expired entries never survive a
/// round-trip through storage.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CollectionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Per-collection access ─────────────────────────────────────────────

  fn load_bids(
    &self,
  ) -> impl Future<Output = Result<Vec<Bid>, Self::Error>> + Send + '_;

  fn persist_bids<'a>(
    &'a self,
    bids: &'a [Bid],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn load_docs(
    &self,
  ) -> impl Future<Output = Result<Vec<CompanyDocument>, Self::Error>> + Send + '_;

  fn persist_docs<'a>(
    &'a self,
    docs: &'a [CompanyDocument],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn load_products(
    &self,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  fn persist_products<'a>(
    &'a self,
    products: &'a [Product],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn load_activities(
    &self,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  fn persist_activities<'a>(
    &'a self,
    activities: &'a [Activity],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Load the audit log, retention applied.
  fn load_logs(
    &self,
  ) -> impl Future<Output = Result<Vec<AuditLogEntry>, Self::Error>> + Send + '_;

  /// Persist the audit log, retention applied before writing.
  fn persist_logs<'a>(
    &'a self,
    logs: &'a [AuditLogEntry],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn load_knowledge(
    &self,
  ) -> impl Future<Output = Result<Vec<KnowledgeDoc>, Self::Error>> + Send + '_;

  fn persist_knowledge<'a>(
    &'a self,
    docs: &'a [KnowledgeDoc],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Snapshot access ───────────────────────────────────────────────────

  /// Assemble the full cloud-sync bundle (knowledge docs excluded).
  fn load_snapshot(
    &self,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  /// Replace every synchronized collection at once.
  fn persist_snapshot<'a>(
    &'a self,
    snapshot: &'a Snapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Remote store ────────────────────────────────────────────────────────────

/// The pointer row tracking the remote snapshot file.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePointer {
  /// Object path within the bucket, e.g. `{user_id}/oraculo_state.json`.
  pub path:       String,
  pub updated_at: DateTime<Utc>,
  /// SHA-256 hex digest of the stored payload, when known.
  pub digest:     Option<String>,
}

/// A fetched remote snapshot together with its pointer timestamp.
#[derive(Debug, Clone)]
pub struct RemoteSnapshot {
  pub snapshot:   Snapshot,
  pub updated_at: DateTime<Utc>,
}

/// One whole-snapshot file per user in a remote object store, tracked by a
/// pointer row used for staleness detection before overwrite.
pub trait SnapshotRemote: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the pointer row without downloading the snapshot.
  /// `None` means no snapshot has ever been pushed.
  fn head(
    &self,
  ) -> impl Future<Output = Result<Option<RemotePointer>, Self::Error>> + Send + '_;

  /// Download the current snapshot, if any.
  fn fetch(
    &self,
  ) -> impl Future<Output = Result<Option<RemoteSnapshot>, Self::Error>> + Send + '_;

  /// Upload `snapshot` wholesale, replacing any prior file, and move the
  /// pointer row to `pushed_at`.
  fn push<'a>(
    &'a self,
    snapshot: &'a Snapshot,
    pushed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<RemotePointer, Self::Error>> + Send + 'a;

  /// Whether the adapter's error represents a missing or expired session
  /// rather than a transport/storage failure. Sessionless operation is
  /// "offline mode", not an error.
  fn is_auth_error(error: &Self::Error) -> bool;
}
