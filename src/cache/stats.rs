//! Cache Statistics Module
//!
//! Tracks read, write, eviction and sweep counters for the memory cache.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live record
    pub hits: u64,
    /// Reads that found nothing or an expired record
    pub misses: u64,
    /// Accepted writes
    pub writes: u64,
    /// Writes refused for policy or capacity reasons
    pub rejected_writes: u64,
    /// Entries removed because the store was under pressure
    pub lru_evictions: u64,
    /// Entries removed because they expired
    pub expired_evictions: u64,
    /// Expired entries kept alive for another lifetime
    pub deferrals: u64,
    /// LRU candidates the policy refused to evict
    pub lru_rejections: u64,
    /// Completed sweep passes
    pub sweeps: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current sum of entry sizes in bytes
    pub current_usage: u64,
    /// Admission limit in bytes
    pub memory_capacity: u64,
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

    /// Total evictions of either kind.
    pub fn evictions(&self) -> u64 {
        self.lru_evictions + self.expired_evictions
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by readers, writers and sweeps.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    rejected_writes: AtomicU64,
    lru_evictions: AtomicU64,
    expired_evictions: AtomicU64,
    deferrals: AtomicU64,
    lru_rejections: AtomicU64,
    sweeps: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_write(&self) {
        self.rejected_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lru_eviction(&self) {
        self.lru_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_eviction(&self) {
        self.expired_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deferral(&self) {
        self.deferrals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lru_rejection(&self) {
        self.lru_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters and fills in the store gauges.
    pub fn snapshot(
        &self,
        total_entries: usize,
        current_usage: u64,
        memory_capacity: u64,
    ) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            rejected_writes: self.rejected_writes.load(Ordering::Relaxed),
            lru_evictions: self.lru_evictions.load(Ordering::Relaxed),
            expired_evictions: self.expired_evictions.load(Ordering::Relaxed),
            deferrals: self.deferrals.load(Ordering::Relaxed),
            lru_rejections: self.lru_rejections.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            total_entries,
            current_usage,
            memory_capacity,
        }
    }
}
