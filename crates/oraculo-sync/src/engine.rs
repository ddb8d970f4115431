//! The sync engine — single-flight push with optimistic locking, and the
//! pull-and-merge path that reconciles cloud state into the local store.
//!
//! Push is best-effort eventual consistency: a rejected attempt is never
//! queued or retried here; the next local mutation triggers the next try.

use std::sync::{
  Arc, Mutex, MutexGuard,
  atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use oraculo_core::{
  audit,
  merge::merge_collections,
  snapshot::Snapshot,
  store::{CollectionStore, SnapshotRemote},
};

/// Seconds the remote pointer may run ahead of the last-known stamp before a
/// push is rejected as a conflict. Absorbs clock skew between devices.
pub const CLOCK_SKEW_ALLOWANCE_SECS: i64 = 2;

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Soft result of a push attempt. Never an `Err`: every failure mode is a
/// value the caller may log or surface as a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
  /// The snapshot was uploaded; the pointer row now carries this stamp.
  Completed { timestamp: DateTime<Utc> },
  /// Another push is in flight. Not queued, not retried.
  Busy,
  /// No session — cloud operations are silently skipped.
  Offline,
  /// The remote moved ahead of our last-known state; nothing was written.
  Conflict,
  /// Storage-layer failure; remote state is unchanged.
  Failed(String),
}

/// Engine status as surfaced to the UI header badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
  Idle,
  Syncing,
  Synced,
  Offline,
  Error,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The explicit service object owning the sync flags.
///
/// Constructed once per process and shared; the whole snapshot is the unit
/// of mutual exclusion, guarded by one in-flight flag.
pub struct SyncEngine<L, R> {
  local:  Arc<L>,
  remote: Option<Arc<R>>,
  in_flight: AtomicBool,
  /// The remote pointer stamp as of our last successful pull or push; the
  /// optimistic lock compares against this.
  last_remote_update: Mutex<Option<DateTime<Utc>>>,
  state: Mutex<SyncState>,
}

impl<L, R> SyncEngine<L, R>
where
  L: CollectionStore,
  R: SnapshotRemote,
{
  /// `remote: None` is offline mode: every cloud operation becomes a no-op.
  pub fn new(local: Arc<L>, remote: Option<Arc<R>>) -> Self {
    Self {
      local,
      remote,
      in_flight: AtomicBool::new(false),
      last_remote_update: Mutex::new(None),
      state: Mutex::new(SyncState::Idle),
    }
  }

  pub fn state(&self) -> SyncState {
    *lock(&self.state)
  }

  pub fn last_remote_update(&self) -> Option<DateTime<Utc>> {
    *lock(&self.last_remote_update)
  }

  fn set_state(&self, state: SyncState) {
    *lock(&self.state) = state;
  }

  /// The local snapshot, served before any network round-trip completes.
  pub async fn load_local(&self) -> Result<Snapshot, L::Error> {
    self.local.load_snapshot().await
  }

  // ── Pull ──────────────────────────────────────────────────────────────

  /// Fetch the remote snapshot and reconcile it into the local store:
  /// every collection is merged independently, log retention re-applied,
  /// and the merged result persisted locally.
  ///
  /// Returns `Ok(true)` when a remote snapshot was merged. A missing
  /// snapshot, a lost session, or a transport failure all leave local
  /// state authoritative and return `Ok(false)` — the user sees nothing.
  /// Only local-store failures are errors.
  pub async fn sync_from_remote(&self) -> Result<bool, L::Error> {
    let Some(remote) = self.remote.clone() else {
      self.set_state(SyncState::Offline);
      return Ok(false);
    };

    self.set_state(SyncState::Syncing);
    let fetched = match remote.fetch().await {
      Ok(Some(fetched)) => fetched,
      Ok(None) => {
        self.set_state(SyncState::Idle);
        return Ok(false);
      }
      Err(e) if R::is_auth_error(&e) => {
        self.set_state(SyncState::Offline);
        return Ok(false);
      }
      Err(e) => {
        tracing::warn!(error = %e, "remote fetch failed; keeping local state");
        self.set_state(SyncState::Error);
        return Ok(false);
      }
    };

    let local = self.local.load_snapshot().await?;
    let merged = merge_snapshots(&local, &fetched.snapshot, Utc::now());
    self.local.persist_snapshot(&merged).await?;

    *lock(&self.last_remote_update) = Some(fetched.updated_at);
    self.set_state(SyncState::Synced);
    tracing::debug!(stamp = %fetched.updated_at, "merged remote snapshot");
    Ok(true)
  }

  // ── Push ──────────────────────────────────────────────────────────────

  /// Upload the current local snapshot wholesale.
  ///
  /// At most one push runs at a time: a second attempt while one is in
  /// flight is rejected immediately with [`PushOutcome::Busy`].
  pub async fn push(&self) -> PushOutcome {
    let Some(remote) = self.remote.clone() else {
      self.set_state(SyncState::Offline);
      return PushOutcome::Offline;
    };

    if self.in_flight.swap(true, Ordering::SeqCst) {
      return PushOutcome::Busy;
    }

    self.set_state(SyncState::Syncing);
    let outcome = self.push_inner(remote.as_ref()).await;
    self.in_flight.store(false, Ordering::SeqCst);

    self.set_state(match outcome {
      PushOutcome::Completed { .. } => SyncState::Synced,
      PushOutcome::Offline => SyncState::Offline,
      _ => SyncState::Error,
    });
    outcome
  }

  async fn push_inner(&self, remote: &R) -> PushOutcome {
    let mut snapshot = match self.local.load_snapshot().await {
      Ok(snapshot) => snapshot,
      Err(e) => return PushOutcome::Failed(e.to_string()),
    };
    snapshot.logs = audit::retain_recent(snapshot.logs, Utc::now());

    // Optimistic lock: refuse to overwrite a remote that moved ahead of
    // what we last saw. Only engages once a pull or push recorded a stamp.
    let last_known = self.last_remote_update();
    match remote.head().await {
      Ok(Some(pointer)) => {
        if let Some(known) = last_known
          && pointer.updated_at
            > known + Duration::seconds(CLOCK_SKEW_ALLOWANCE_SECS)
        {
          tracing::info!(
            remote = %pointer.updated_at,
            known = %known,
            "push rejected: remote snapshot is newer"
          );
          return PushOutcome::Conflict;
        }
      }
      Ok(None) => {}
      Err(e) if R::is_auth_error(&e) => return PushOutcome::Offline,
      Err(e) => return PushOutcome::Failed(e.to_string()),
    }

    let pushed_at = Utc::now();
    match remote.push(&snapshot, pushed_at).await {
      Ok(pointer) => {
        *lock(&self.last_remote_update) = Some(pointer.updated_at);
        PushOutcome::Completed { timestamp: pointer.updated_at }
      }
      Err(e) if R::is_auth_error(&e) => PushOutcome::Offline,
      Err(e) => PushOutcome::Failed(e.to_string()),
    }
  }
}

// ─── Snapshot merge ──────────────────────────────────────────────────────────

/// Merge every collection of two snapshots independently. No
/// cross-collection invariant is enforced. Log retention re-applies after
/// the merge so expired remote entries cannot resurrect.
pub fn merge_snapshots(
  local: &Snapshot,
  remote: &Snapshot,
  now: DateTime<Utc>,
) -> Snapshot {
  Snapshot {
    bids:       merge_collections(&local.bids, &remote.bids),
    docs:       merge_collections(&local.docs, &remote.docs),
    products:   merge_collections(&local.products, &remote.products),
    activities: merge_collections(&local.activities, &remote.activities),
    logs:       audit::retain_recent(
      merge_collections(&local.logs, &remote.logs),
      now,
    ),
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::time::Duration as StdDuration;

  use uuid::Uuid;

  use oraculo_core::bid::{Bid, BidModality, BidStatus, upsert_bid};
  use oraculo_store_sqlite::SqliteStore;

  use super::*;
  use crate::remote::MemoryRemote;

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

  async fn engine_with(
    remote: Option<MemoryRemote>,
  ) -> (Arc<SqliteStore>, Arc<SyncEngine<SqliteStore, MemoryRemote>>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let engine = Arc::new(SyncEngine::new(store.clone(), remote.map(Arc::new)));
    (store, engine)
  }

  #[tokio::test]
  async fn push_without_a_session_is_offline() {
    let (_store, engine) = engine_with(None).await;
    assert_eq!(engine.push().await, PushOutcome::Offline);
    assert_eq!(engine.state(), SyncState::Offline);
  }

  #[tokio::test]
  async fn push_uploads_the_whole_snapshot_and_records_the_stamp() {
    let (store, engine) = engine_with(Some(MemoryRemote::new())).await;
    store
      .persist_bids(&[bid("Pregão 12/2024", Utc::now())])
      .await
      .unwrap();

    let outcome = engine.push().await;

    let PushOutcome::Completed { timestamp } = outcome else {
      panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(engine.last_remote_update(), Some(timestamp));
    assert_eq!(engine.state(), SyncState::Synced);
  }

  #[tokio::test]
  async fn second_push_while_one_is_in_flight_is_rejected() {
    let remote = MemoryRemote::new()
      .with_push_delay(StdDuration::from_millis(100));
    let (_store, engine) = engine_with(Some(remote)).await;

    let first = tokio::spawn({
      let engine = engine.clone();
      async move { engine.push().await }
    });
    // Let the first push claim the flag and park in the remote delay.
    tokio::time::sleep(StdDuration::from_millis(20)).await;

    assert_eq!(engine.push().await, PushOutcome::Busy);
    assert!(matches!(
      first.await.unwrap(),
      PushOutcome::Completed { .. }
    ));
  }

  #[tokio::test]
  async fn push_conflicts_when_remote_moved_past_the_known_stamp() {
    let remote = MemoryRemote::new();
    let t1 = Utc::now() - Duration::minutes(10);
    remote.seed(Snapshot::default(), t1);

    let (_store, engine) = engine_with(Some(remote)).await;
    // A pull records t1 as the last-known remote stamp.
    assert!(engine.sync_from_remote().await.unwrap());

    // Another device pushes afterwards.
    if let Some(remote) = &engine.remote {
      remote.seed(Snapshot::default(), t1 + Duration::seconds(30));
    }

    assert_eq!(engine.push().await, PushOutcome::Conflict);
    assert_eq!(engine.state(), SyncState::Error);
  }

  #[tokio::test]
  async fn push_within_the_skew_allowance_is_not_a_conflict() {
    let remote = MemoryRemote::new();
    let t1 = Utc::now() - Duration::minutes(10);
    remote.seed(Snapshot::default(), t1);

    let (_store, engine) = engine_with(Some(remote)).await;
    assert!(engine.sync_from_remote().await.unwrap());

    if let Some(remote) = &engine.remote {
      remote.seed(Snapshot::default(), t1 + Duration::seconds(1));
    }

    assert!(matches!(
      engine.push().await,
      PushOutcome::Completed { .. }
    ));
  }

  #[tokio::test]
  async fn first_push_of_a_fresh_client_overwrites_without_conflict() {
    // No pull ever happened, so there is no last-known stamp: the lock
    // does not engage even though the remote already has a snapshot.
    let remote = MemoryRemote::new();
    remote.seed(Snapshot::default(), Utc::now());

    let (_store, engine) = engine_with(Some(remote)).await;

    assert!(matches!(
      engine.push().await,
      PushOutcome::Completed { .. }
    ));
  }

  #[tokio::test]
  async fn expired_session_turns_push_into_offline() {
    let remote = MemoryRemote::new();
    remote.set_unauthorized(true);
    let (_store, engine) = engine_with(Some(remote)).await;

    assert_eq!(engine.push().await, PushOutcome::Offline);
    assert_eq!(engine.state(), SyncState::Offline);
  }

  #[tokio::test]
  async fn sync_from_remote_merges_each_collection_into_the_store() {
    let t_old = Utc::now() - Duration::hours(2);
    let t_new = Utc::now() - Duration::hours(1);

    let shared = bid("local antiga", t_old);
    let mut remote_copy = shared.clone();
    remote_copy.title = "editada na nuvem".to_string();
    remote_copy.updated_at = Some(t_new);
    let remote_only = bid("só na nuvem", t_old);

    let remote = MemoryRemote::new();
    remote.seed(
      Snapshot {
        bids: vec![remote_copy, remote_only],
        ..Snapshot::default()
      },
      Utc::now(),
    );

    let (store, engine) = engine_with(Some(remote)).await;
    store.persist_bids(&[shared]).await.unwrap();

    assert!(engine.sync_from_remote().await.unwrap());

    let bids = store.load_bids().await.unwrap();
    assert_eq!(bids.len(), 2);
    let titles: Vec<&str> = bids.iter().map(|b| b.title.as_str()).collect();
    assert!(titles.contains(&"editada na nuvem"));
    assert!(titles.contains(&"só na nuvem"));
    assert!(engine.last_remote_update().is_some());
    assert_eq!(engine.state(), SyncState::Synced);
  }

  #[tokio::test]
  async fn missing_remote_snapshot_keeps_local_state_authoritative() {
    let (store, engine) = engine_with(Some(MemoryRemote::new())).await;
    let mut bids = Vec::new();
    upsert_bid(&mut bids, bid("somente local", Utc::now()), Utc::now());
    store.persist_bids(&bids).await.unwrap();

    assert!(!engine.sync_from_remote().await.unwrap());

    let kept = store.load_bids().await.unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title, "somente local");
  }
}
