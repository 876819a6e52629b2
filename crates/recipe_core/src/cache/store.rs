//! Fail-open cache adapter.
//!
//! # Responsibility
//! - Own the shared backend handle and absorb every backend failure.
//! - Count hits, misses and degraded calls for diagnostics.
//!
//! # Invariants
//! - No method returns an error: failed reads are misses, failed writes and
//!   deletes are no-ops, failed prefix deletes report `0`.
//! - Each call makes exactly one backend attempt.

use crate::cache::backend::{CacheBackend, CacheError, NoopCacheBackend};
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time copy of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
    /// Backend calls that failed and were absorbed.
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
    errors: AtomicU64,
}

#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    counters: Arc<Counters>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Store whose every read misses. Used when caching is disabled.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopCacheBackend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.get(key) {
            Ok(Some(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(err) => {
                self.degraded("cache_get", key, &err);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        match self.backend.set(key, value, ttl) {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => self.degraded("cache_set", key, &err),
        }
    }

    pub fn delete(&self, key: &str) {
        match self.backend.delete(key) {
            Ok(true) => {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(err) => self.degraded("cache_delete", key, &err),
        }
    }

    /// Removes every key starting with `prefix`; returns the removed count.
    pub fn delete_by_prefix(&self, prefix: &str) -> u64 {
        match self.backend.delete_by_prefix(prefix) {
            Ok(removed) => {
                self.counters
                    .evictions
                    .fetch_add(removed, Ordering::Relaxed);
                removed
            }
            Err(err) => {
                self.degraded("cache_delete_prefix", prefix, &err);
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    fn degraded(&self, event: &str, key: &str, err: &CacheError) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        warn!(
            "event={} module=cache status=degraded backend={} key={} error={}",
            event,
            self.backend.name(),
            key,
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::CacheStore;
    use crate::cache::memory::MemoryCacheBackend;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn stats_track_hits_and_misses() {
        let store = CacheStore::new(Arc::new(MemoryCacheBackend::new()));
        assert_eq!(store.get("user:1"), None);
        store.set("user:1", b"{}", Duration::from_secs(60));
        assert_eq!(store.get("user:1").as_deref(), Some(b"{}".as_slice()));

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn disabled_store_always_misses() {
        let store = CacheStore::disabled();
        store.set("user:1", b"{}", Duration::from_secs(60));
        assert_eq!(store.get("user:1"), None);
        assert_eq!(store.delete_by_prefix("user:"), 0);
        assert_eq!(store.backend_name(), "noop");
    }
}
