//! Cloud synchronization for the Oráculo bid tracker.
//!
//! A whole-snapshot, last-write-wins model: the full bundle of collections
//! is one JSON file per user in a remote object store, tracked by a pointer
//! row. The [`SyncEngine`] coordinates single-flight pushes with optimistic
//! locking and the pull-and-merge startup path; [`backup`] covers manual
//! export/import of the same bundle.

pub mod backup;
pub mod engine;
pub mod error;
pub mod remote;

pub use engine::{PushOutcome, SyncEngine, SyncState};
pub use error::{Error, Result};
pub use remote::{HttpRemote, MemoryRemote, RemoteConfig};
