//! The overlay context: everything a host needs, constructed once and passed
//! explicitly.
//!
//! It owns the comparator registry, the loaded catalog, the compiled filter
//! for the current query, the query history and the snapshot tracker.
//! Reloading rebuilds the catalog wholesale, dropping every memoized
//! fingerprint with it.

use std::sync::Arc;

use crate::catalog::{Catalog, CatalogError, CatalogProvider};
use crate::config::OverlayConfig;
use crate::craftable::tracker::{SnapshotTracker, TrackerState};
use crate::entry::comparison::ComparatorRegistry;
use crate::entry::identity::EntryIdentity;
use crate::search::filter::SearchFilter;
use crate::search::highlight::{Highlight, highlight};
use crate::search::history::QueryHistory;

#[derive(Debug)]
pub struct OverlayContext {
    registry: Arc<ComparatorRegistry>,
    config: OverlayConfig,
    catalog: Catalog,
    filter: SearchFilter,
    /// Indices into the catalog of entries the current filter accepts.
    visible: Vec<usize>,
    history: QueryHistory,
    tracker: SnapshotTracker,
}

impl OverlayContext {
    /// Loads the catalog and starts with an empty query.
    pub fn new(
        registry: Arc<ComparatorRegistry>,
        config: OverlayConfig,
        provider: &dyn CatalogProvider,
        tracker: SnapshotTracker,
    ) -> Result<Self, CatalogError> {
        let catalog = Catalog::load(provider, &registry, config.catalog.merge_duplicates)?;
        let history = QueryHistory::new(config.search.history_limit);
        let mut ctx = Self {
            registry,
            config,
            catalog,
            filter: SearchFilter::always(),
            visible: Vec::new(),
            history,
            tracker,
        };
        ctx.refresh_visible();
        Ok(ctx)
    }

    pub fn registry(&self) -> &ComparatorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    pub fn query(&self) -> &str {
        self.filter.query()
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    pub fn tracker(&self) -> &SnapshotTracker {
        &self.tracker
    }

    fn refresh_visible(&mut self) {
        self.visible = self
            .catalog
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| self.filter.test_with_facts(&e.identity, &e.facts))
            .map(|(i, _)| i)
            .collect();
    }

    /// Re-tokenizes, re-compiles and re-runs the query over the catalog.
    /// Returns the number of visible entries.
    pub fn set_query(&mut self, query: &str) -> usize {
        self.filter = SearchFilter::compile(query, &self.config.search.grammar());
        self.refresh_visible();
        tracing::debug!(query = query, visible = self.visible.len(), "search_complete");
        self.visible.len()
    }

    /// Records the current query in the history.
    pub fn submit_query(&mut self) {
        let query = self.filter.query().to_string();
        self.history.push(&query);
    }

    /// Moves up through the history. Returns true when the query changed.
    pub fn history_previous(&mut self) -> bool {
        let current = self.filter.query().to_string();
        match self.history.previous(&current) {
            Some(query) => {
                self.set_query(&query);
                true
            }
            None => false,
        }
    }

    /// Moves down through the history. Returns true when the query changed.
    pub fn history_next(&mut self) -> bool {
        match self.history.next(self.filter.query()) {
            Some(query) => {
                self.set_query(&query);
                true
            }
            None => false,
        }
    }

    pub fn visible(&self) -> impl Iterator<Item = &EntryIdentity> {
        self.visible
            .iter()
            .filter_map(|&i| self.catalog.entries().get(i))
            .map(|e| &e.identity)
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn has_results(&self) -> bool {
        !self.visible.is_empty()
    }

    /// Styled spans for the current query.
    pub fn highlight(&self) -> Vec<Highlight> {
        highlight(
            self.filter.query(),
            self.config.search.syntax_highlighting,
            self.has_results(),
        )
    }

    /// Rebuilds the catalog from `provider`. The current query is re-run
    /// and the tracker marked dirty so craftable state is re-evaluated.
    pub fn reload(&mut self, provider: &dyn CatalogProvider) -> Result<(), CatalogError> {
        self.catalog = Catalog::load(
            provider,
            &self.registry,
            self.config.catalog.merge_duplicates,
        )?;
        self.refresh_visible();
        self.tracker.mark_dirty();
        Ok(())
    }

    pub fn tick(&mut self) -> TrackerState {
        self.tracker.tick()
    }

    pub fn consume_dirty(&mut self) -> bool {
        self.tracker.consume_dirty()
    }

    /// How many of `entry` the player has on hand across both sources.
    pub fn obtainable(&self, entry: &EntryIdentity) -> u64 {
        self.tracker.available(entry.stock_fingerprint(&self.registry))
    }
}
