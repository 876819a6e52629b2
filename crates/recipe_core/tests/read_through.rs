use recipe_core::cache::backend::{CacheBackend, CacheError, CacheResult};
use recipe_core::cache::memory::MemoryCacheBackend;
use recipe_core::cache::read_through::ReadThroughAccessor;
use recipe_core::{CacheEntity, CacheKey, CacheStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(60);

struct UnreachableBackend;

impl CacheBackend for UnreachableBackend {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn delete(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn delete_by_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

fn memory_accessor() -> (Arc<MemoryCacheBackend>, ReadThroughAccessor) {
    let backend = Arc::new(MemoryCacheBackend::new());
    let accessor = ReadThroughAccessor::new(CacheStore::new(backend.clone()));
    (backend, accessor)
}

#[test]
fn second_read_is_served_from_cache() {
    let (backend, accessor) = memory_accessor();
    let key = CacheKey::item(CacheEntity::Recipe, 1);
    let loads = AtomicUsize::new(0);
    let load = || -> Result<Vec<String>, String> {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["onion".to_string()])
    };

    let first = accessor.get_or_load(&key, TTL, load).unwrap();
    let second = accessor.get_or_load(&key, TTL, load).unwrap();

    assert_eq!(first, second);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(backend.contains("recipe:1"));
    let stats = accessor.store().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.writes, 1);
}

#[test]
fn loader_errors_are_not_cached() {
    let (backend, accessor) = memory_accessor();
    let key = CacheKey::item(CacheEntity::Recipe, 404);

    let missing: Result<String, &str> = accessor.get_or_load(&key, TTL, || Err("not found"));
    assert_eq!(missing.unwrap_err(), "not found");
    assert!(!backend.contains("recipe:404"));

    let found: Result<String, &str> =
        accessor.get_or_load(&key, TTL, || Ok("created later".to_string()));
    assert_eq!(found.unwrap(), "created later");
}

#[test]
fn unreachable_cache_falls_back_to_loader_every_time() {
    let accessor = ReadThroughAccessor::new(CacheStore::new(Arc::new(UnreachableBackend)));
    let key = CacheKey::list(CacheEntity::Ingredient);
    let loads = AtomicUsize::new(0);

    for _ in 0..3 {
        let value: Result<u32, ()> = accessor.get_or_load(&key, TTL, || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });
        assert_eq!(value, Ok(7));
    }

    assert_eq!(loads.load(Ordering::SeqCst), 3);
    let stats = accessor.store().stats();
    assert_eq!(stats.hits, 0);
    // Two reads (before and after taking the in-flight slot) and one fill per call.
    assert_eq!(stats.errors, 9);
}

#[test]
fn undecodable_cached_value_is_replaced() {
    let (backend, accessor) = memory_accessor();
    let key = CacheKey::item(CacheEntity::Tag, 3);
    accessor.store().set(key.as_str(), b"{not json", TTL);

    let value: Result<Vec<u32>, ()> = accessor.get_or_load(&key, TTL, || Ok(vec![1, 2]));
    assert_eq!(value, Ok(vec![1, 2]));

    let cached: Result<Vec<u32>, ()> = accessor.get_or_load(&key, TTL, || Ok(Vec::new()));
    assert_eq!(cached, Ok(vec![1, 2]));
    assert!(backend.contains("tag:3"));
}

#[test]
fn concurrent_misses_on_one_key_run_a_single_load() {
    let (_backend, accessor) = memory_accessor();
    let loads = Arc::new(AtomicUsize::new(0));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let accessor = accessor.clone();
            let loads = Arc::clone(&loads);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let key = CacheKey::qualified_list(CacheEntity::Recipe, "all:top:l10:o0");
                accessor
                    .get_or_load(&key, TTL, || -> Result<Vec<i64>, ()> {
                        loads.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok(vec![3, 1, 2])
                    })
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![3, 1, 2]);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(accessor.in_flight_len(), 0);
}

#[test]
fn expired_entries_reload() {
    let (_backend, accessor) = memory_accessor();
    let key = CacheKey::item(CacheEntity::BoardPost, 5);
    let loads = AtomicUsize::new(0);
    let load = || -> Result<u8, ()> {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    };

    accessor
        .get_or_load(&key, Duration::from_millis(20), load)
        .unwrap();
    thread::sleep(Duration::from_millis(40));
    accessor
        .get_or_load(&key, Duration::from_millis(20), load)
        .unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 2);
}
