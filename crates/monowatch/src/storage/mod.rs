//! Persistence of reconciled snapshots.

mod snapshot_store;

pub use snapshot_store::{SnapshotStore, load_snapshot};
