//! Per-instance counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters describing how lookups were served.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    coalesced: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Served straight from the result store.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Attached to a fetch another caller started.
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Became the leader and invoked the producer.
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub coalesced: u64,
    pub fetches: u64,
    pub failures: u64,
    pub invalidations: u64,
}

impl StatsSnapshot {
    /// Share of lookups that did not start a producer call (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let served = self.hits + self.coalesced;
        let total = served + self.fetches;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats::new();
        assert_eq!(stats.snapshot().hit_ratio(), 0.0);

        stats.record_fetch();
        stats.record_coalesced();
        stats.record_hit();
        stats.record_hit();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.fetches, 1);
        assert_eq!(snapshot.hit_ratio(), 0.75);
    }
}
