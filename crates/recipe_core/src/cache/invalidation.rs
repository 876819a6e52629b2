//! Post-write cache eviction rules.
//!
//! Callers run these only after the durable write has committed. Eviction is
//! best-effort; a skipped eviction leaves an entry that expires by TTL.

use crate::cache::key::{CacheEntity, CacheKey};
use crate::cache::store::CacheStore;
use log::debug;

#[derive(Clone)]
pub struct WriteInvalidation {
    store: CacheStore,
}

impl WriteInvalidation {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// Evicts list-level keys only; the new item key is left unpopulated.
    pub fn after_create(&self, entity: CacheEntity) {
        self.evict_lists(entity);
    }

    /// Evicts the item key, `extra_keys` (secondary lookups) and every
    /// list-level key of `entity`.
    pub fn after_update(&self, entity: CacheEntity, id: i64, extra_keys: &[CacheKey]) {
        self.evict_item(entity, id, extra_keys);
        self.evict_lists(entity);
    }

    pub fn after_delete(&self, entity: CacheEntity, id: i64, extra_keys: &[CacheKey]) {
        self.evict_item(entity, id, extra_keys);
        self.evict_lists(entity);
    }

    /// Evicts `<entity>:list` and every `<entity>:list:*` key.
    pub fn evict_lists(&self, entity: CacheEntity) {
        self.store.delete(CacheKey::list(entity).as_str());
        let removed = self
            .store
            .delete_by_prefix(&entity.qualified_list_prefix());
        debug!(
            "event=cache_evict module=cache status=ok scope=lists entity={} removed_qualified={}",
            entity, removed
        );
    }

    /// Evicts every key of `entity`, items and lists alike.
    ///
    /// Used for dependents whose cached views embed data of another entity.
    pub fn evict_entity(&self, entity: CacheEntity) {
        let removed = self.store.delete_by_prefix(&entity.namespace());
        debug!(
            "event=cache_evict module=cache status=ok scope=entity entity={} removed={}",
            entity, removed
        );
    }

    /// Evicts the item key and `extra_keys`, leaving lists in place.
    pub fn evict_item(&self, entity: CacheEntity, id: i64, extra_keys: &[CacheKey]) {
        self.store.delete(CacheKey::item(entity, id).as_str());
        for key in extra_keys {
            self.store.delete(key.as_str());
        }
        debug!(
            "event=cache_evict module=cache status=ok scope=item entity={} id={} extra_keys={}",
            entity,
            id,
            extra_keys.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::WriteInvalidation;
    use crate::cache::key::{CacheEntity, CacheKey};
    use crate::cache::memory::MemoryCacheBackend;
    use crate::cache::store::CacheStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn seeded() -> (Arc<MemoryCacheBackend>, WriteInvalidation) {
        let backend = Arc::new(MemoryCacheBackend::new());
        let store = CacheStore::new(backend.clone());
        let ttl = Duration::from_secs(60);
        for key in [
            "recipe:1",
            "recipe:2",
            "recipe:list",
            "recipe:list:top:10",
            "ingredient:list",
        ] {
            store.set(key, b"x", ttl);
        }
        (backend, WriteInvalidation::new(store))
    }

    #[test]
    fn create_keeps_item_keys() {
        let (backend, invalidation) = seeded();
        invalidation.after_create(CacheEntity::Recipe);

        assert!(!backend.contains("recipe:list"));
        assert!(!backend.contains("recipe:list:top:10"));
        assert!(backend.contains("recipe:1"));
        assert!(backend.contains("ingredient:list"));
    }

    #[test]
    fn update_evicts_item_and_extra_keys() {
        let (backend, invalidation) = seeded();
        invalidation.after_update(
            CacheEntity::Recipe,
            1,
            &[CacheKey::item(CacheEntity::Recipe, 2)],
        );

        assert!(!backend.contains("recipe:1"));
        assert!(!backend.contains("recipe:2"));
        assert!(!backend.contains("recipe:list"));
        assert!(backend.contains("ingredient:list"));
    }

    #[test]
    fn evict_entity_clears_whole_namespace() {
        let (backend, invalidation) = seeded();
        invalidation.evict_entity(CacheEntity::Recipe);

        assert_eq!(backend.len(), 1);
        assert!(backend.contains("ingredient:list"));
    }
}
