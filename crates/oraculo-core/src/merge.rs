//! Reconciliation of a local and a remote copy of one collection.
//!
//! This is the heart of the sync model: each collection is merged
//! independently, last write wins per record, and the whole routine is a
//! total function — it cannot fail.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::record::Recency;

/// Merge two copies of the same logical collection into one.
///
/// One record survives per distinct id: the one with the greater recency key
/// (`updated_at`, else `timestamp`, else epoch zero). Ties go to the side
/// scanned later — remote is scanned first, so **local wins ties**. The
/// result is ordered most-recent first; records with no recency key rank
/// last.
pub fn merge_collections<T>(local: &[T], remote: &[T]) -> Vec<T>
where
  T: Recency + Clone,
{
  let mut index: HashMap<Uuid, usize> = HashMap::new();
  let mut merged: Vec<T> = Vec::new();

  for record in remote.iter().chain(local.iter()) {
    match index.get(&record.record_id()) {
      Some(&slot) => {
        if recency_key(record) >= recency_key(&merged[slot]) {
          merged[slot] = record.clone();
        }
      }
      None => {
        index.insert(record.record_id(), merged.len());
        merged.push(record.clone());
      }
    }
  }

  // Stable sort: equal keys keep their remote-then-local scan order.
  merged.sort_by(|a, b| recency_key(b).cmp(&recency_key(a)));
  merged
}

fn recency_key<T: Recency>(record: &T) -> DateTime<Utc> {
  record.recency().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
