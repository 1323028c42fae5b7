//! Cache Statistics Module
//!
//! Tracks reads, evictions and footprint of the cache.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful reads
    pub hits: u64,
    /// Number of reads of absent keys
    pub misses: u64,
    /// Items removed by the optimizer because their priority dropped to 0
    pub expired: u64,
    /// Items removed by the optimizer to meet the size budget
    pub compacted: u64,
    /// Completed optimizer sweeps
    pub sweeps: u64,
    /// Current number of items
    pub total_entries: usize,
    /// Current estimated footprint in bytes
    pub size: usize,
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

    /// Total items removed by the optimizer.
    pub fn evictions(&self) -> u64 {
        self.expired + self.compacted
    }
}

// == Stats Counters ==
/// Lock-free counters updated from shared and exclusive store paths alike.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    compacted: AtomicU64,
    sweeps: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compacted(&self) {
        self.compacted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_entries: usize, size: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            compacted: self.compacted.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            total_entries,
            size,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions(), 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = StatsCounters::default();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.snapshot(0, 0).hit_rate(), 0.5);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let counters = StatsCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        assert_eq!(counters.snapshot(0, 0).hit_rate(), 1.0);
    }

    #[test]
    fn test_evictions_sum() {
        let counters = StatsCounters::default();
        counters.record_expired();
        counters.record_expired();
        counters.record_compacted();
        counters.record_sweep();

        let stats = counters.snapshot(4, 128);
        assert_eq!(stats.expired, 2);
        assert_eq!(stats.compacted, 1);
        assert_eq!(stats.evictions(), 3);
        assert_eq!(stats.sweeps, 1);
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.size, 128);
    }
}
