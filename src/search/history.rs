//! Submitted-query history with up/down navigation.

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Oldest first. Entries are unique ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHistory {
    entries: VecDeque<String>,
    limit: usize,
}

impl Default for QueryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl QueryHistory {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Records `query` as the newest entry. Empty text is ignored and an
    /// earlier entry differing only in case is replaced.
    pub fn push(&mut self, query: &str) {
        if query.is_empty() {
            return;
        }
        let folded = query.to_lowercase();
        self.entries.retain(|q| q.to_lowercase() != folded);
        self.entries.push_back(query.to_string());
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    fn position(&self, current: &str) -> Option<usize> {
        self.entries.iter().position(|q| q == current)
    }

    /// Entry to show when moving up from `current`.
    ///
    /// From text not in the history, an empty field jumps to the newest
    /// entry; non-empty text is recorded first so it can be navigated back
    /// to. `None` means stay put.
    pub fn previous(&mut self, current: &str) -> Option<String> {
        let index = match self.position(current) {
            Some(index) => index.checked_sub(1)?,
            None if current.is_empty() => self.entries.len().checked_sub(1)?,
            None => {
                self.push(current);
                self.entries.len().checked_sub(2)?
            }
        };
        self.entries.get(index).cloned()
    }

    /// Entry to show when moving down from `current`. Moving past the newest
    /// entry yields an empty query; text not in the history stays put.
    pub fn next(&self, current: &str) -> Option<String> {
        let index = self.position(current)? + 1;
        Some(self.entries.get(index).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(queries: &[&str]) -> QueryHistory {
        let mut h = QueryHistory::default();
        for q in queries {
            h.push(q);
        }
        h
    }

    #[test]
    fn push_dedupes_ignoring_case() {
        let h = history(&["iron", "gold", "IRON", ""]);
        assert_eq!(h.iter().collect::<Vec<_>>(), ["gold", "IRON"]);
    }

    #[test]
    fn push_evicts_oldest_beyond_limit() {
        let mut h = QueryHistory::new(2);
        for q in ["a", "b", "c"] {
            h.push(q);
        }
        assert_eq!(h.iter().collect::<Vec<_>>(), ["b", "c"]);
        assert_eq!(QueryHistory::new(0).limit(), 1);
    }

    #[test]
    fn navigate_up_and_down() {
        let mut h = history(&["a", "b", "c"]);
        assert_eq!(h.previous("").as_deref(), Some("c"));
        assert_eq!(h.previous("c").as_deref(), Some("b"));
        assert_eq!(h.previous("a"), None);
        assert_eq!(h.next("a").as_deref(), Some("b"));
        assert_eq!(h.next("c").as_deref(), Some(""));
        assert_eq!(h.next("unknown"), None);
    }

    #[test]
    fn up_from_unsaved_query_records_it() {
        let mut h = history(&["a", "b"]);
        assert_eq!(h.previous("draft").as_deref(), Some("b"));
        assert_eq!(h.iter().collect::<Vec<_>>(), ["a", "b", "draft"]);
        assert_eq!(h.next("b").as_deref(), Some("draft"));
    }

    #[test]
    fn up_on_empty_history() {
        let mut h = QueryHistory::default();
        assert_eq!(h.previous(""), None);
        assert_eq!(h.previous("x"), None);
        assert_eq!(h.len(), 1);
    }
}
