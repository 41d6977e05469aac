use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::request::CacheOutcome;

/// Counters shared by every clone of an accelerator.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    not_modified: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    skipped: AtomicU64,
    invalidations: AtomicU64,
    store_errors: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub not_modified: u64,
    pub misses: u64,
    pub stores: u64,
    pub skipped: u64,
    pub invalidations: u64,
    pub store_errors: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&self, outcome: CacheOutcome) {
        let counter = match outcome {
            CacheOutcome::Hit => &self.hits,
            CacheOutcome::NotModified => &self.not_modified,
            CacheOutcome::Stored => &self.stores,
            CacheOutcome::Miss => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if matches!(outcome, CacheOutcome::Stored | CacheOutcome::Miss) {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            not_modified: self.not_modified.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

impl CacheStatsSnapshot {
    /// Share of requests answered without running the handler.
    pub fn hit_ratio(&self) -> f64 {
        let served = self.hits + self.not_modified;
        let total = served + self.misses;
        if total == 0 {
            return 0.0;
        }
        served as f64 / total as f64
    }
}
