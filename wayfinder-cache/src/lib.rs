//! Generic, backend-agnostic TTL cache used by `wayfinder-core`'s dual
//! request/structural cache.
//!
//! This crate knows nothing about planning, queries, or routes — it is a
//! thread-safe map with absolute-expiry entries, lazily evicted on read.
//! Domain-specific key derivation and value substitution live in
//! `wayfinder-core::cache`.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A thread-safe TTL cache backed by `DashMap`.
///
/// Entries expire after the configured `ttl` and are lazily evicted on
/// access: a reader observing an expired entry removes it before
/// reporting a miss.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Arc<DashMap<K, (V, Instant)>>,
    ttl: Duration,
}

/// Snapshot counters for a single [`TtlCache`] tier.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub active_entries: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a cached value if it exists and hasn't expired.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.inner.get(key) {
            let (val, inserted) = entry.value();
            if inserted.elapsed() < self.ttl {
                return Some(val.clone());
            }
            drop(entry);
            self.inner.remove(key);
        }
        None
    }

    /// Insert or update a value, resetting its expiry clock.
    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, (value, Instant::now()));
    }

    pub fn remove(&self, key: &K) {
        self.inner.remove(key);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Remove all expired entries without waiting for them to be read.
    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        self.inner.retain(|_, (_, inserted)| inserted.elapsed() < ttl);
    }

    /// Counts for debugging/metrics: total stored entries vs. entries that
    /// have not yet expired (an expired entry still counts toward
    /// `total_entries` until the next access or an explicit eviction pass).
    pub fn stats(&self) -> CacheStats {
        let ttl = self.ttl;
        let total_entries = self.inner.len();
        let active_entries = self
            .inner
            .iter()
            .filter(|entry| entry.value().1.elapsed() < ttl)
            .count();
        CacheStats {
            total_entries,
            active_entries,
        }
    }

    /// Keys currently stored, including not-yet-evicted expired ones.
    /// Intended for debug inspection, not hot paths.
    pub fn keys(&self) -> Vec<K> {
        self.inner.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
