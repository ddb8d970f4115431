//! The snapshot — the atomic unit of cloud synchronization — and the
//! export/import envelope built on top of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  activity::Activity, audit::AuditLogEntry, bid::Bid, doc::CompanyDocument,
  product::Product,
};

/// The complete bundle of one user's synchronized collections.
///
/// Knowledge docs are deliberately absent: they stay on the device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
  #[serde(default)]
  pub bids:       Vec<Bid>,
  #[serde(default)]
  pub docs:       Vec<CompanyDocument>,
  #[serde(default)]
  pub products:   Vec<Product>,
  #[serde(default)]
  pub activities: Vec<Activity>,
  #[serde(default)]
  pub logs:       Vec<AuditLogEntry>,
}

impl Snapshot {
  pub fn is_empty(&self) -> bool {
    self.bids.is_empty()
      && self.docs.is_empty()
      && self.products.is_empty()
      && self.activities.is_empty()
      && self.logs.is_empty()
  }
}

/// A downloadable backup: a snapshot plus the moment it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFile {
  #[serde(flatten)]
  pub data: Snapshot,
  #[serde(rename = "exportedAt")]
  pub exported_at: DateTime<Utc>,
}
