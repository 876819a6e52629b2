//! Process-local cache backend on `moka`.
//!
//! # Invariants
//! - Every entry expires after the TTL it was last written with.
//! - Residency is bounded by `max_capacity`; moka evicts expired and cold
//!   entries during its housekeeping.

use crate::cache::backend::{CacheBackend, CacheResult};
use moka::sync::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on resident keys when no capacity is configured.
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Clone)]
struct MemoryEntry {
    value: Arc<[u8]>,
    ttl: Duration,
}

/// Applies each entry's own TTL on insert and overwrite; reads do not extend it.
struct EntryTtl;

impl Expiry<String, MemoryEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MemoryCacheBackend {
    entries: Cache<String, MemoryEntry>,
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();
        Self { entries }
    }

    /// Returns whether a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries still held in memory after pending evictions run, expired or not.
    pub fn resident_len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value.to_vec()))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let entry = MemoryEntry {
            value: Arc::from(value),
            ttl,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let matching: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();
        let removed = matching
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryCacheBackend;
    use crate::cache::backend::CacheBackend;
    use std::time::Duration;

    #[test]
    fn expired_entries_read_as_missing() {
        let backend = MemoryCacheBackend::new();
        backend
            .set("recipe:1", b"v", Duration::from_millis(10))
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(backend.get("recipe:1").unwrap(), None);
        assert!(!backend.contains("recipe:1"));
    }

    #[test]
    fn overwrite_takes_the_new_ttl() {
        let backend = MemoryCacheBackend::new();
        backend
            .set("recipe:1", b"old", Duration::from_millis(10))
            .unwrap();
        backend
            .set("recipe:1", b"new", Duration::from_secs(60))
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(backend.get("recipe:1").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn delete_by_prefix_counts_removed_keys_only() {
        let backend = MemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        backend.set("recipe:list", b"a", ttl).unwrap();
        backend.set("recipe:list:top:10", b"b", ttl).unwrap();
        backend.set("recipe:1", b"c", ttl).unwrap();

        assert_eq!(backend.delete_by_prefix("recipe:list:").unwrap(), 1);
        assert!(backend.contains("recipe:list"));
        assert!(backend.contains("recipe:1"));
    }

    #[test]
    fn expired_page_keys_are_released() {
        let backend = MemoryCacheBackend::new();
        for offset in 0..5_000 {
            let key = format!("recipe:list:all:newest:l10:o{offset}");
            backend.set(&key, b"[]", Duration::from_millis(1)).unwrap();
        }
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(backend.len(), 0);
        assert!((0..10).any(|_| backend.resident_len() == 0));
    }

    #[test]
    fn residency_is_bounded_by_capacity() {
        let backend = MemoryCacheBackend::with_capacity(100);
        for id in 0..1_000 {
            backend
                .set(&format!("recipe:{id}"), b"{}", Duration::from_secs(60))
                .unwrap();
        }

        assert!((0..10).any(|_| backend.resident_len() <= 100));
    }
}
