//! Cache Statistics Module
//!
//! Counts hits, misses, writes and deletes seen through cache events.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::debug;

use super::{CacheEvent, CacheObserver};

// == Cache Stats ==
/// Snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Successful writes
    pub writes: u64,
    /// Successful deletes
    pub deletes: u64,
    /// Writes, deletes and clears the backend refused
    pub failures: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Observer ==
/// Observer keeping running totals across every store it is attached to.
#[derive(Debug, Default)]
pub struct StatsObserver {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    failures: AtomicU64,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current counters.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}

impl CacheObserver for StatsObserver {
    fn notify(&self, event: &CacheEvent) {
        match event {
            CacheEvent::Hit { .. } | CacheEvent::Has { .. } => Self::add(&self.hits, 1),
            CacheEvent::Missed { .. } | CacheEvent::HasMissed { .. } => {
                Self::add(&self.misses, 1)
            }
            CacheEvent::MultipleHit { values, .. } => Self::add(&self.hits, values.len()),
            CacheEvent::MultipleMissed { keys, .. } => Self::add(&self.misses, keys.len()),
            CacheEvent::Written { .. } => Self::add(&self.writes, 1),
            CacheEvent::MultipleWritten { values, .. } => Self::add(&self.writes, values.len()),
            CacheEvent::Deleted { .. } => Self::add(&self.deletes, 1),
            CacheEvent::MultipleDeleted { keys, .. } => Self::add(&self.deletes, keys.len()),
            CacheEvent::Cleared { .. } => {}
            CacheEvent::WriteMissed { .. }
            | CacheEvent::DeleteMissed { .. }
            | CacheEvent::ClearMissed { .. }
            | CacheEvent::MultipleWriteMissed { .. }
            | CacheEvent::MultipleDeleteMissed { .. } => Self::add(&self.failures, 1),
        }
    }
}

// == Tracing Observer ==
/// Observer writing every event to the `tracing` log at debug level.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn notify(&self, event: &CacheEvent) {
        debug!(store = event.store(), event = event.kind(), "cache event");
    }
}
