//! Fingerprint → count maps of an external item source.

use fxhash::FxHashMap;
use thiserror::Error;

use crate::entry::comparison::ComparatorRegistry;
use crate::entry::identity::EntryIdentity;
use crate::model::types::Fingerprint;

/// Aggregated counts keyed by fuzzy fingerprint. Counts are never negative.
///
/// Equality is set equality over `(fingerprint, count)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot(FxHashMap<Fingerprint, u64>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates a source's stacks under their settings-independent fuzzy
    /// fingerprint. Empty entries are skipped and negative counts clamp to
    /// zero.
    pub fn from_entries<'a, I>(entries: I, registry: &ComparatorRegistry) -> Self
    where
        I: IntoIterator<Item = &'a EntryIdentity>,
    {
        let mut snapshot = Self::new();
        for entry in entries {
            if entry.is_empty() {
                continue;
            }
            let fp = entry.stock_fingerprint(registry);
            snapshot.add(fp, entry.count());
        }
        snapshot
    }

    /// Adds `count` (clamped at zero) to `fingerprint`'s total. Zero counts
    /// leave no key behind.
    pub fn add(&mut self, fingerprint: Fingerprint, count: i64) {
        let count = u64::try_from(count).unwrap_or(0);
        if count == 0 {
            return;
        }
        let slot = self.0.entry(fingerprint).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Count on hand for `fingerprint`; zero when absent.
    pub fn available(&self, fingerprint: Fingerprint) -> u64 {
        self.0.get(&fingerprint).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Fingerprint, u64)> + '_ {
        self.0.iter().map(|(fp, count)| (*fp, *count))
    }
}

impl FromIterator<(Fingerprint, i64)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (Fingerprint, i64)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for (fp, count) in iter {
            snapshot.add(fp, count);
        }
        snapshot
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("snapshot source unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// An external item source polled once per tick.
pub trait SnapshotProvider {
    fn snapshot(&mut self) -> Result<Snapshot, ProviderError>;
}

impl<F> SnapshotProvider for F
where
    F: FnMut() -> Result<Snapshot, ProviderError>,
{
    fn snapshot(&mut self) -> Result<Snapshot, ProviderError> {
        self()
    }
}
