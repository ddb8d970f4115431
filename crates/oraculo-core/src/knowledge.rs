//! Reference documents fed to the assistant as background knowledge.
//!
//! Local-only: this collection is never part of the cloud snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDoc {
  pub id:        Uuid,
  pub name:      String,
  pub mime_type: String,
  pub base64:    String,
  pub added_at:  DateTime<Utc>,
}
