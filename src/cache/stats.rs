//! Cache Statistics Module
//!
//! Tracks lookup outcomes, persists and deferred commits for a cache handle.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of lookups that found an entry
    pub hits: u64,
    /// Number of lookups that found nothing
    pub misses: u64,
    /// Number of whole-file snapshot writes
    pub persists: u64,
    /// Number of deferred entries applied by commits
    pub committed: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Entries waiting in the deferred queue
    pub pending: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Records a lookup, counting it as a hit or a miss.
    pub fn record_lookup(&mut self, found: bool) {
        if found {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    /// Increments the persist counter.
    pub fn record_persist(&mut self) {
        self.persists += 1;
    }

    /// Adds `count` committed deferred entries.
    pub fn record_commit(&mut self, count: usize) {
        self.committed += count as u64;
    }
}
