//! Manual backup: export the full snapshot to a JSON file and import one
//! back, either replacing local state wholesale or merging by id.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use oraculo_core::{
  audit,
  snapshot::{BackupFile, Snapshot},
  store::CollectionStore,
};

use crate::engine::merge_snapshots;

/// The two import semantics. The caller chooses explicitly; there is no
/// entry-point-dependent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
  /// Restore: wholesale replacement of every collection.
  Replace,
  /// Merge each collection by id, most recent record winning.
  Merge,
}

/// Build the export envelope. Log retention applies here too — a backup is
/// a write path.
pub fn export(snapshot: &Snapshot, now: DateTime<Utc>) -> BackupFile {
  let mut data = snapshot.clone();
  data.logs = audit::retain_recent(data.logs, now);
  BackupFile { data, exported_at: now }
}

/// Pretty-printed JSON for download.
pub fn to_pretty_json(backup: &BackupFile) -> Result<String, serde_json::Error> {
  serde_json::to_string_pretty(backup)
}

/// Download filename: `KitsVital_Backup_YYYY-MM-DD.json`.
pub fn suggested_filename(now: DateTime<Utc>) -> String {
  format!("KitsVital_Backup_{}.json", now.format("%Y-%m-%d"))
}

/// Parse an uploaded backup. Malformed input fails the whole import; no
/// partial apply ever happens.
pub fn parse(json: &str) -> Result<BackupFile, serde_json::Error> {
  serde_json::from_str(json)
}

/// Apply a parsed backup to the local store and return the resulting
/// snapshot.
pub async fn apply<L: CollectionStore>(
  store: &L,
  backup: &BackupFile,
  mode: ImportMode,
  now: DateTime<Utc>,
) -> Result<Snapshot, L::Error> {
  let next = match mode {
    ImportMode::Replace => {
      let mut snapshot = backup.data.clone();
      snapshot.logs = audit::retain_recent(snapshot.logs, now);
      snapshot
    }
    ImportMode::Merge => {
      let local = store.load_snapshot().await?;
      merge_snapshots(&local, &backup.data, now)
    }
  };
  store.persist_snapshot(&next).await?;
  Ok(next)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use uuid::Uuid;

  use oraculo_core::{
    audit::{AuditAction, AuditEntity, AuditLogEntry},
    bid::{Bid, BidModality, BidStatus},
  };
  use oraculo_store_sqlite::SqliteStore;

  use super::*;

  fn bid(title: &str, updated_at: DateTime<Utc>) -> Bid {
    Bid {
      id:                Uuid::new_v4(),
      user_id:           None,
      order:             None,
      uasg:              None,
      title:             title.to_string(),
      bidding_number:    "1/2024".to_string(),
      organ:             "Prefeitura".to_string(),
      modality:          BidModality::ElectronicAuction,
      disputed_item:     String::new(),
      items:             Vec::new(),
      date:              "2024-05-10T09:00".to_string(),
      value:             0.0,
      anvisa:            false,
      sample:            false,
      status:            BidStatus::Launched,
      documents:         Vec::new(),
      notes:             None,
      payment_date:      None,
      commitment_date:   None,
      tracking_code:     None,
      delivery_deadline: None,
      created_at:        None,
      updated_at:        Some(updated_at),
    }
  }

  fn log_entry(name: &str, timestamp: DateTime<Utc>) -> AuditLogEntry {
    AuditLogEntry {
      id:          Uuid::new_v4(),
      user:        "Marcos".to_string(),
      action:      AuditAction::Create,
      entity_type: AuditEntity::Bid,
      entity_name: name.to_string(),
      timestamp,
    }
  }

  #[test]
  fn export_stamps_the_envelope_and_drops_expired_logs() {
    let now = Utc::now();
    let snapshot = Snapshot {
      logs: vec![
        log_entry("fresh", now - Duration::days(1)),
        log_entry("stale", now - Duration::days(10)),
      ],
      ..Snapshot::default()
    };

    let backup = export(&snapshot, now);

    assert_eq!(backup.exported_at, now);
    assert_eq!(backup.data.logs.len(), 1);
    assert_eq!(backup.data.logs[0].entity_name, "fresh");
  }

  #[test]
  fn envelope_wire_shape_is_flat_with_exported_at() {
    let now = Utc::now();
    let json = to_pretty_json(&export(&Snapshot::default(), now)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert!(value.get("bids").is_some());
    assert!(value.get("logs").is_some());
    assert!(value.get("exportedAt").is_some());
  }

  #[test]
  fn suggested_filename_uses_the_export_date() {
    let now = "2024-06-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
    assert_eq!(suggested_filename(now), "KitsVital_Backup_2024-06-01.json");
  }

  #[test]
  fn malformed_backup_fails_to_parse() {
    assert!(parse("{\"bids\": \"not an array\"}").is_err());
    assert!(parse("nonsense").is_err());
  }

  #[tokio::test]
  async fn export_then_replace_import_round_trips_every_record() {
    let now = Utc::now();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let original = Snapshot {
      bids: vec![bid("A", now), bid("B", now)],
      logs: vec![log_entry("criou A", now)],
      ..Snapshot::default()
    };
    store.persist_snapshot(&original).await.unwrap();

    let json = to_pretty_json(&export(&original, now)).unwrap();

    // Wipe, then restore from the exported file.
    store.persist_snapshot(&Snapshot::default()).await.unwrap();
    let parsed = parse(&json).unwrap();
    let restored = apply(&store, &parsed, ImportMode::Replace, now)
      .await
      .unwrap();

    assert_eq!(restored.bids.len(), 2);
    let ids: Vec<Uuid> = restored.bids.iter().map(|b| b.id).collect();
    for b in &original.bids {
      assert!(ids.contains(&b.id));
    }
    assert_eq!(restored.logs.len(), 1);

    let reloaded = store.load_snapshot().await.unwrap();
    assert_eq!(reloaded.bids.len(), 2);
  }

  #[tokio::test]
  async fn merge_import_keeps_the_newer_copy_per_id() {
    let now = Utc::now();
    let store = SqliteStore::open_in_memory().await.unwrap();

    let ours = bid("versão local", now);
    store.persist_bids(std::slice::from_ref(&ours)).await.unwrap();

    let mut theirs = ours.clone();
    theirs.title = "versão do arquivo".to_string();
    theirs.updated_at = Some(now + Duration::hours(1));
    let extra = bid("só no arquivo", now);

    let backup = export(
      &Snapshot {
        bids: vec![theirs, extra],
        ..Snapshot::default()
      },
      now,
    );

    let merged = apply(&store, &backup, ImportMode::Merge, now).await.unwrap();

    assert_eq!(merged.bids.len(), 2);
    let ours_after = merged.bids.iter().find(|b| b.id == ours.id).unwrap();
    assert_eq!(ours_after.title, "versão do arquivo");
  }

  #[tokio::test]
  async fn replace_import_discards_records_absent_from_the_file() {
    let now = Utc::now();
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .persist_bids(&[bid("será descartada", now)])
      .await
      .unwrap();

    let backup = export(
      &Snapshot {
        bids: vec![bid("única restante", now)],
        ..Snapshot::default()
      },
      now,
    );
    apply(&store, &backup, ImportMode::Replace, now).await.unwrap();

    let bids = store.load_bids().await.unwrap();
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].title, "única restante");
  }
}
