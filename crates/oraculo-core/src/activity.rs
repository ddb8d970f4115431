//! The shared task list ("Atividades").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Recency, Touch};

/// Which task view an activity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityCategory {
  #[serde(rename = "meu-dia")]
  MyDay,
  #[serde(rename = "importante")]
  Important,
  #[serde(rename = "todas")]
  All,
}

/// Who the task was assigned to, relative to its creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentKind {
  #[serde(rename = "ambos")]
  Both,
  #[serde(rename = "parceiro")]
  Partner,
  #[serde(rename = "proprio")]
  Own,
}

/// A to-do entry, optionally linked to a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
  pub id:        Uuid,
  pub owner:     String,
  pub title:     String,
  pub category:  ActivityCategory,
  pub completed: bool,
  pub created_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  /// Due date as entered (`YYYY-MM-DD`).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_important: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bid_id: Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignment_type: Option<AssignmentKind>,
  #[serde(default, rename = "updated_at", skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Recency for Activity {
  fn record_id(&self) -> Uuid {
    self.id
  }

  fn recency(&self) -> Option<DateTime<Utc>> {
    self.updated_at
  }
}

impl Touch for Activity {
  fn touch(&mut self, now: DateTime<Utc>) {
    self.updated_at = Some(now);
  }
}
