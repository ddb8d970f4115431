//! Product catalog entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Recency, Touch};

/// A sellable product with its pricing floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  #[serde(default, rename = "user_id", skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  pub name:         String,
  pub model:        String,
  pub manufacturer: String,
  /// Floor price below which the item is never offered.
  pub min_price:  f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cost_price: Option<f64>,
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

impl Recency for Product {
  fn record_id(&self) -> Uuid {
    self.id
  }

  fn recency(&self) -> Option<DateTime<Utc>> {
    self.updated_at
  }
}

impl Touch for Product {
  fn touch(&mut self, now: DateTime<Utc>) {
    self.updated_at = Some(now);
  }
}
