//! The in-memory catalog: provider entries wrapped into identities.
//!
//! A catalog is built wholesale from a [`CatalogProvider`] and replaced
//! wholesale on reload; it is never patched in place. Search facts are
//! derived once per entry at load time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use fxhash::FxHashMap;
use thiserror::Error;

use crate::entry::comparison::{ComparatorRegistry, ComparisonContext};
use crate::entry::identity::EntryIdentity;
use crate::model::types::{Fingerprint, RawEntry};
use crate::search::filter::{SearchFacts, SearchFilter};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog provider failed: {0}")]
    Provider(String),
}

/// Source of raw catalog entries. Re-invoked on every reload.
pub trait CatalogProvider {
    fn load_entries(&self) -> Result<Vec<RawEntry>, CatalogError>;
}

/// Reads a JSON array of entries from disk.
#[derive(Debug, Clone)]
pub struct JsonCatalogProvider {
    path: PathBuf,
}

impl JsonCatalogProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogProvider for JsonCatalogProvider {
    fn load_entries(&self) -> Result<Vec<RawEntry>, CatalogError> {
        let text = fs::read_to_string(&self.path).map_err(|source| CatalogError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// Serves a fixed, in-memory list of entries.
#[derive(Debug, Clone, Default)]
pub struct VecCatalogProvider(pub Vec<RawEntry>);

impl CatalogProvider for VecCatalogProvider {
    fn load_entries(&self) -> Result<Vec<RawEntry>, CatalogError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub identity: EntryIdentity,
    pub facts: SearchFacts,
}

impl CatalogEntry {
    fn new(identity: EntryIdentity) -> Self {
        let facts = SearchFacts::from_entry(&identity);
        Self { identity, facts }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn load(
        provider: &dyn CatalogProvider,
        registry: &ComparatorRegistry,
        merge_duplicates: bool,
    ) -> Result<Self, CatalogError> {
        let start = Instant::now();
        let raw = provider.load_entries()?;
        let provided = raw.len();
        let catalog = Self::from_raw(raw, registry, merge_duplicates);
        tracing::info!(
            provided,
            entries = catalog.len(),
            merge_duplicates,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "catalog_loaded"
        );
        Ok(catalog)
    }

    /// Wraps raw entries, in order. With `merge_duplicates`, interchangeable
    /// entries (same fuzzy identity) collapse into the first occurrence with
    /// summed counts.
    pub fn from_raw(raw: Vec<RawEntry>, registry: &ComparatorRegistry, merge_duplicates: bool) -> Self {
        let identities = raw.into_iter().map(EntryIdentity::from);
        if !merge_duplicates {
            return Self {
                entries: identities.map(CatalogEntry::new).collect(),
            };
        }

        let mut merged: Vec<EntryIdentity> = Vec::new();
        let mut buckets: FxHashMap<Fingerprint, Vec<usize>> = FxHashMap::default();
        for identity in identities {
            let fp = identity.fingerprint(registry, ComparisonContext::Fuzzy);
            let bucket = buckets.entry(fp).or_default();
            let combined = bucket
                .iter()
                .find_map(|&i| merged[i].merge(&identity, registry).map(|m| (i, m)));
            match combined {
                Some((i, m)) => merged[i] = m,
                None => {
                    bucket.push(merged.len());
                    merged.push(identity);
                }
            }
        }
        Self {
            entries: merged.into_iter().map(CatalogEntry::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryIdentity> {
        self.entries.iter().map(|e| &e.identity)
    }

    /// Entries visible under `filter`, in catalog order.
    pub fn matching<'a>(
        &'a self,
        filter: &'a SearchFilter,
    ) -> impl Iterator<Item = &'a EntryIdentity> + 'a {
        self.entries
            .iter()
            .filter(|e| filter.test_with_facts(&e.identity, &e.facts))
            .map(|e| &e.identity)
    }
}
