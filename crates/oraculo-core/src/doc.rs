//! Company compliance documents (certificates, registrations, permits).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Recency, Touch};

/// Validity of a compliance document relative to its expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocValidity {
  Valid,
  Expiring,
  Expired,
}

/// How critical the document is for bid participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocImportance {
  #[serde(rename = "Baixa")]
  Low,
  #[serde(rename = "Média")]
  Medium,
  #[serde(rename = "Alta")]
  High,
}

/// A compliance document the company must keep current.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDocument {
  pub id: Uuid,
  #[serde(default, rename = "user_id", skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  pub name:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub organ:    Option<String>,
  pub category: String,
  pub issue_date:      String,
  pub expiration_date: String,
  pub status:     DocValidity,
  pub importance: DocImportance,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file_url:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base64:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mime_type: Option<String>,
  #[serde(default, rename = "created_at", skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, rename = "updated_at", skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Recency for CompanyDocument {
  fn record_id(&self) -> Uuid {
    self.id
  }

  fn recency(&self) -> Option<DateTime<Utc>> {
    self.updated_at
  }
}

impl Touch for CompanyDocument {
  fn touch(&mut self, now: DateTime<Utc>) {
    self.updated_at = Some(now);
  }
}
