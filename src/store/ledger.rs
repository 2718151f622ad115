use indexmap::IndexSet;

use crate::consts::{LEDGER_COMPACT_THRESHOLD, LEDGER_RETAIN};

/// Ids of capture deliveries that have already been handled, in the
/// order they were recorded.
///
/// Bounded: once it grows past the threshold, [`compact`](Self::compact)
/// keeps only the most recently inserted ids.
#[derive(Debug)]
pub struct DedupLedger {
    seen: IndexSet<String>,
    threshold: usize,
    retain: usize,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::with_limits(LEDGER_COMPACT_THRESHOLD, LEDGER_RETAIN)
    }

    /// `retain` is clamped to `threshold`.
    pub fn with_limits(threshold: usize, retain: usize) -> Self {
        Self {
            seen: IndexSet::new(),
            threshold,
            retain: retain.min(threshold),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Record an id. Returns false if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.seen.insert(id.into())
    }

    /// Drop the oldest ids if the ledger exceeds its threshold.
    /// Returns how many were dropped.
    pub fn compact(&mut self) -> usize {
        if self.seen.len() <= self.threshold {
            return 0;
        }
        let dropped = self.seen.len() - self.retain;
        self.seen.drain(..dropped);
        dropped
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new()
    }
}
