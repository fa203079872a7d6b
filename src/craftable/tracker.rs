//! Per-tick change detection over the held inventory and the open container.
//!
//! ```text
//!            tick() sees a change
//!   Clean ─────────────────────────▶ Dirty
//!     ▲     mark_dirty()               │
//!     └────────── consume_dirty() ─────┘
//! ```
//!
//! A tick does nothing while `Dirty`. Otherwise it polls the inventory and,
//! only if that is unchanged, the container. At most one source is replaced
//! per tick.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::craftable::snapshot::{ProviderError, Snapshot, SnapshotProvider};
use crate::model::types::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerState {
    Clean,
    Dirty,
}

struct Source {
    name: &'static str,
    provider: Box<dyn SnapshotProvider>,
    last: Snapshot,
    failing: bool,
}

impl Source {
    fn new(name: &'static str, provider: Box<dyn SnapshotProvider>) -> Self {
        Self {
            name,
            provider,
            last: Snapshot::new(),
            failing: false,
        }
    }

    /// Pulls a fresh snapshot; returns true when it replaced the stored one.
    fn poll(&mut self) -> bool {
        let next = match self.provider.snapshot() {
            Ok(snapshot) => {
                if self.failing {
                    self.failing = false;
                    debug!(source = self.name, "snapshot_provider_recovered");
                }
                snapshot
            }
            Err(err) => {
                if self.failing {
                    debug!(source = self.name, error = %err, "snapshot_provider_failed");
                } else {
                    self.failing = true;
                    warn!(
                        source = self.name,
                        error = %err,
                        "snapshot provider failed; treating source as empty"
                    );
                }
                Snapshot::new()
            }
        };
        if next == self.last {
            return false;
        }
        trace!(source = self.name, slots = next.len(), "snapshot_changed");
        self.last = next;
        true
    }
}

/// Edge-triggered dirty flag over two snapshot sources.
pub struct SnapshotTracker {
    inventory: Source,
    container: Source,
    state: TrackerState,
}

impl std::fmt::Debug for SnapshotTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotTracker")
            .field("state", &self.state)
            .field("inventory", &self.inventory.last)
            .field("container", &self.container.last)
            .finish()
    }
}

impl SnapshotTracker {
    /// Starts `Clean` with two empty snapshots.
    pub fn new(
        inventory: impl SnapshotProvider + 'static,
        container: impl SnapshotProvider + 'static,
    ) -> Self {
        Self::from_boxed(Box::new(inventory), Box::new(container))
    }

    /// Tracker whose sources are always empty; for hosts without a player.
    pub fn idle() -> Self {
        Self::new(
            || Ok::<_, ProviderError>(Snapshot::new()),
            || Ok::<_, ProviderError>(Snapshot::new()),
        )
    }

    pub fn from_boxed(
        inventory: Box<dyn SnapshotProvider>,
        container: Box<dyn SnapshotProvider>,
    ) -> Self {
        Self {
            inventory: Source::new("inventory", inventory),
            container: Source::new("container", container),
            state: TrackerState::Clean,
        }
    }

    pub fn tick(&mut self) -> TrackerState {
        if self.state == TrackerState::Dirty {
            return self.state;
        }
        if self.inventory.poll() || self.container.poll() {
            self.state = TrackerState::Dirty;
        }
        self.state
    }

    pub fn mark_dirty(&mut self) {
        self.state = TrackerState::Dirty;
    }

    /// True exactly once per transition to `Dirty`.
    pub fn consume_dirty(&mut self) -> bool {
        if self.state == TrackerState::Dirty {
            self.state = TrackerState::Clean;
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn inventory(&self) -> &Snapshot {
        &self.inventory.last
    }

    pub fn container(&self) -> &Snapshot {
        &self.container.last
    }

    /// Combined count across both sources.
    pub fn available(&self, fingerprint: Fingerprint) -> u64 {
        self.inventory
            .last
            .available(fingerprint)
            .saturating_add(self.container.last.available(fingerprint))
    }
}
