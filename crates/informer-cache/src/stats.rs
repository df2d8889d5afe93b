//! Store statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for store operations.
///
/// All counters are atomic and can be safely accessed from multiple threads.
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Objects added or updated.
    upserts: AtomicU64,
    /// Objects removed.
    deletes: AtomicU64,
    /// Full replacements (relists).
    replaces: AtomicU64,
    /// Key lookups that found an object.
    hits: AtomicU64,
    /// Key lookups that found nothing.
    misses: AtomicU64,
}

impl StoreStats {
    /// Create new store statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an add or update.
    #[inline]
    pub fn record_upsert(&self) {
        self.upserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delete.
    #[inline]
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a replace.
    #[inline]
    pub fn record_replace(&self) {
        self.replaces.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup hit.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup miss.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Total adds and updates.
    #[inline]
    pub fn upserts(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Total deletes.
    #[inline]
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Total replaces.
    #[inline]
    pub fn replaces(&self) -> u64 {
        self.replaces.load(Ordering::Relaxed)
    }

    /// Total lookup hits.
    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total lookup misses.
    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Lookup hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }
}
