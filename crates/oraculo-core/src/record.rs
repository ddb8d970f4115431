//! Traits shared by every record collection.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Read access to the fields the reconciliation routine keys on.
pub trait Recency {
  /// Unique identifier within the record's collection.
  fn record_id(&self) -> Uuid;

  /// The record's recency key: `updated_at` where the record carries one,
  /// else its write-once `timestamp`. `None` ranks as least recent.
  fn recency(&self) -> Option<DateTime<Utc>>;
}

/// Mutation stamping. Every mutation moves `updated_at` forward.
pub trait Touch {
  fn touch(&mut self, now: DateTime<Utc>);
}

/// Re-stamp a whole collection with one timestamp. The page-level save
/// paths replace a collection wholesale and stamp every record at once.
pub fn touch_all<T: Touch>(records: &mut [T], now: DateTime<Utc>) {
  for record in records {
    record.touch(now);
  }
}
