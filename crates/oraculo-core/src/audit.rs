//! Audit trail of operator actions.
//!
//! Entries are write-once and short-lived: anything older than
//! [`RETENTION_DAYS`] is dropped on every read and every write path, so an
//! expired entry never survives into persisted or displayed state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::Recency;

/// How long an audit entry is kept.
pub const RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
  Create,
  Update,
  Delete,
  Sync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEntity {
  Bid,
  Doc,
  Product,
  Activity,
  Finance,
}

/// One write-once audit entry. No field ever changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
  pub id:          Uuid,
  pub user:        String,
  pub action:      AuditAction,
  pub entity_type: AuditEntity,
  pub entity_name: String,
  pub timestamp:   DateTime<Utc>,
}

impl AuditLogEntry {
  pub fn new(
    user: impl Into<String>,
    action: AuditAction,
    entity_type: AuditEntity,
    entity_name: impl Into<String>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      user: user.into(),
      action,
      entity_type,
      entity_name: entity_name.into(),
      timestamp: now,
    }
  }
}

impl Recency for AuditLogEntry {
  fn record_id(&self) -> Uuid {
    self.id
  }

  fn recency(&self) -> Option<DateTime<Utc>> {
    Some(self.timestamp)
  }
}

/// Drop entries older than the retention window relative to `now`.
pub fn retain_recent(
  mut entries: Vec<AuditLogEntry>,
  now: DateTime<Utc>,
) -> Vec<AuditLogEntry> {
  let cutoff = now - Duration::days(RETENTION_DAYS);
  entries.retain(|e| e.timestamp > cutoff);
  entries
}

/// Prepend a fresh entry, apply retention, and keep newest first.
pub fn record(
  entries: Vec<AuditLogEntry>,
  entry: AuditLogEntry,
  now: DateTime<Utc>,
) -> Vec<AuditLogEntry> {
  let mut next = Vec::with_capacity(entries.len() + 1);
  next.push(entry);
  next.extend(entries);
  let mut next = retain_recent(next, now);
  next.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
  next
}
