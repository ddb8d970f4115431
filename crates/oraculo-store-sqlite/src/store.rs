//! [`SqliteStore`] — the SQLite implementation of [`CollectionStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use serde::{Serialize, de::DeserializeOwned};

use oraculo_core::{
  activity::Activity,
  audit::{self, AuditLogEntry},
  bid::Bid,
  doc::CompanyDocument,
  knowledge::KnowledgeDoc,
  product::Product,
  snapshot::Snapshot,
  store::CollectionStore,
};

use crate::{
  Error, Result,
  schema::{SCHEMA, keys},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The on-device collection store, backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Exactly one
/// process writes to the file; no concurrent-writer protection exists beyond
/// SQLite's own locking.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read the raw JSON payload under `key`. `None` if never persisted.
  pub(crate) async fn read_raw(&self, key: &'static str) -> Result<Option<String>> {
    let payload: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT payload FROM collections WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(payload)
  }

  /// Replace the payload under `key` wholesale.
  pub(crate) async fn write_raw(&self, key: &'static str, payload: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO collections (key, payload) VALUES (?1, ?2)
           ON CONFLICT (key) DO UPDATE SET payload = excluded.payload",
          rusqlite::params![key, payload],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn load_collection<T: DeserializeOwned>(
    &self,
    key: &'static str,
  ) -> Result<Vec<T>> {
    match self.read_raw(key).await? {
      Some(raw) => Ok(serde_json::from_str(&raw)?),
      None => Ok(Vec::new()),
    }
  }

  async fn persist_collection<T: Serialize>(
    &self,
    key: &'static str,
    records: &[T],
  ) -> Result<()> {
    let payload = serde_json::to_string(records)?;
    self.write_raw(key, payload).await
  }
}

// ─── CollectionStore impl ────────────────────────────────────────────────────

impl CollectionStore for SqliteStore {
  type Error = Error;

  async fn load_bids(&self) -> Result<Vec<Bid>> {
    self.load_collection(keys::BIDS).await
  }

  async fn persist_bids(&self, bids: &[Bid]) -> Result<()> {
    self.persist_collection(keys::BIDS, bids).await
  }

  async fn load_docs(&self) -> Result<Vec<CompanyDocument>> {
    self.load_collection(keys::DOCS).await
  }

  async fn persist_docs(&self, docs: &[CompanyDocument]) -> Result<()> {
    self.persist_collection(keys::DOCS, docs).await
  }

  async fn load_products(&self) -> Result<Vec<Product>> {
    self.load_collection(keys::PRODUCTS).await
  }

  async fn persist_products(&self, products: &[Product]) -> Result<()> {
    self.persist_collection(keys::PRODUCTS, products).await
  }

  async fn load_activities(&self) -> Result<Vec<Activity>> {
    self.load_collection(keys::ACTIVITIES).await
  }

  async fn persist_activities(&self, activities: &[Activity]) -> Result<()> {
    self.persist_collection(keys::ACTIVITIES, activities).await
  }

  async fn load_logs(&self) -> Result<Vec<AuditLogEntry>> {
    let logs = self.load_collection(keys::LOGS).await?;
    Ok(audit::retain_recent(logs, Utc::now()))
  }

  async fn persist_logs(&self, logs: &[AuditLogEntry]) -> Result<()> {
    let recent = audit::retain_recent(logs.to_vec(), Utc::now());
    self.persist_collection(keys::LOGS, &recent).await
  }

  async fn load_knowledge(&self) -> Result<Vec<KnowledgeDoc>> {
    self.load_collection(keys::KNOWLEDGE).await
  }

  async fn persist_knowledge(&self, docs: &[KnowledgeDoc]) -> Result<()> {
    self.persist_collection(keys::KNOWLEDGE, docs).await
  }

  async fn load_snapshot(&self) -> Result<Snapshot> {
    Ok(Snapshot {
      bids:       self.load_bids().await?,
      docs:       self.load_docs().await?,
      products:   self.load_products().await?,
      activities: self.load_activities().await?,
      logs:       self.load_logs().await?,
    })
  }

  async fn persist_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
    self.persist_bids(&snapshot.bids).await?;
    self.persist_docs(&snapshot.docs).await?;
    self.persist_products(&snapshot.products).await?;
    self.persist_activities(&snapshot.activities).await?;
    self.persist_logs(&snapshot.logs).await?;
    Ok(())
  }
}
