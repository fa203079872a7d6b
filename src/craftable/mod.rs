//! "Currently obtainable" bookkeeping: inventory snapshots and the dirty
//! flag that tells the overlay to re-evaluate craftability.

pub mod snapshot;
pub mod tracker;

pub use snapshot::{ProviderError, Snapshot, SnapshotProvider};
pub use tracker::{SnapshotTracker, TrackerState};
