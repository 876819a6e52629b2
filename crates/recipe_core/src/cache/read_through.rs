//! Cache-aside read path.
//!
//! # Responsibility
//! - Serve reads from the cache when possible, else from a caller-supplied
//!   loader, then populate the cache best-effort.
//! - Coalesce concurrent misses on the same key so one loader runs.
//!
//! # Invariants
//! - The loader runs at most once per call and never on a cache hit.
//! - Loader errors propagate unchanged and are never cached.
//! - A failed cache write never fails the read.
//! - A cached value that does not decode is evicted and treated as a miss.
//! - In-flight slots are removed once no caller holds them.

use crate::cache::key::CacheKey;
use crate::cache::store::CacheStore;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type SlotMap = Mutex<HashMap<String, Arc<Mutex<()>>>>;

#[derive(Clone)]
pub struct ReadThroughAccessor {
    store: CacheStore,
    in_flight: Arc<SlotMap>,
}

impl ReadThroughAccessor {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Returns the cached value for `key`, or loads, caches and returns it.
    ///
    /// Concurrent callers missing on the same key wait for the first loader
    /// and re-check the cache before loading themselves. When the cache is
    /// unreachable every waiter still loads, one after another.
    ///
    /// # Errors
    /// - Returns the loader's error unchanged.
    pub fn get_or_load<T, E, F>(&self, key: &CacheKey, ttl: Duration, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.read_cached(key) {
            return Ok(value);
        }

        let slot = self.enter(key.as_str());
        let _held = slot.hold();

        if let Some(value) = self.read_cached(key) {
            return Ok(value);
        }
        self.load_and_fill(key, ttl, loader)
    }

    /// Number of keys with a load currently in progress or awaited.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn read_cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let bytes = self.store.get(key.as_str())?;
        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => {
                debug!("event=cache_read module=cache status=hit key={}", key);
                Some(value)
            }
            Err(err) => {
                warn!(
                    "event=cache_read module=cache status=degraded key={} error_code=decode_failed error={}",
                    key, err
                );
                self.store.delete(key.as_str());
                None
            }
        }
    }

    fn load_and_fill<T, E, F>(&self, key: &CacheKey, ttl: Duration, loader: F) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Result<T, E>,
    {
        debug!("event=cache_read module=cache status=miss key={}", key);
        let value = loader()?;
        match serde_json::to_vec(&value) {
            Ok(bytes) => self.store.set(key.as_str(), &bytes, ttl),
            Err(err) => warn!(
                "event=cache_fill module=cache status=degraded key={} error_code=encode_failed error={}",
                key, err
            ),
        }
        Ok(value)
    }

    fn enter(&self, key: &str) -> InFlightSlot<'_> {
        let mut slots = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let lock = slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        InFlightSlot {
            slots: &self.in_flight,
            key: key.to_string(),
            lock,
        }
    }
}

/// One caller's registration in the in-flight map.
struct InFlightSlot<'a> {
    slots: &'a SlotMap,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl InFlightSlot<'_> {
    fn hold(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only taken under the map lock, so the count is stable here.
        let last_holder = slots
            .get(&self.key)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock))
            && Arc::strong_count(&self.lock) == 2;
        if last_holder {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReadThroughAccessor;
    use crate::cache::key::{CacheEntity, CacheKey};
    use crate::cache::memory::MemoryCacheBackend;
    use crate::cache::store::CacheStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn accessor() -> ReadThroughAccessor {
        ReadThroughAccessor::new(CacheStore::new(Arc::new(MemoryCacheBackend::new())))
    }

    #[test]
    fn slot_is_released_after_load() {
        let accessor = accessor();
        let key = CacheKey::item(CacheEntity::Tag, 1);
        let value: Result<String, ()> =
            accessor.get_or_load(&key, Duration::from_secs(60), || Ok("quick".to_string()));

        assert_eq!(value.unwrap(), "quick");
        assert_eq!(accessor.in_flight_len(), 0);
    }
}
