//! Cache tier in front of the relational store.
//!
//! # Responsibility
//! - Provide the fail-open key/value store and its backends.
//! - Provide the read-through accessor and the post-write eviction rules.
//! - Bundle both with per-entity TTLs as the `CacheLayer` handed to services.
//!
//! # Invariants
//! - Cache failures never reach service callers.
//! - Services evict only after their durable write has committed.

pub mod backend;
pub mod invalidation;
pub mod key;
pub mod memory;
pub mod read_through;
#[cfg(feature = "redis-cache")]
pub mod redis;
pub mod store;

use crate::config::{CacheBackendKind, CacheConfig, CacheTtls, ConfigError};
use backend::CacheBackend;
use invalidation::WriteInvalidation;
use key::CacheEntity;
use log::info;
use memory::MemoryCacheBackend;
use read_through::ReadThroughAccessor;
use std::sync::Arc;
use std::time::Duration;
use store::CacheStore;

/// Shared cache handle passed to every service.
#[derive(Clone)]
pub struct CacheLayer {
    accessor: ReadThroughAccessor,
    invalidation: WriteInvalidation,
    ttls: CacheTtls,
}

impl CacheLayer {
    pub fn new(store: CacheStore, ttls: CacheTtls) -> Self {
        Self {
            accessor: ReadThroughAccessor::new(store.clone()),
            invalidation: WriteInvalidation::new(store),
            ttls,
        }
    }

    /// Layer over a fresh in-process backend with default TTLs.
    pub fn in_memory() -> Self {
        Self::new(
            CacheStore::new(Arc::new(MemoryCacheBackend::new())),
            CacheTtls::default(),
        )
    }

    /// Layer whose reads always miss.
    pub fn disabled() -> Self {
        Self::new(CacheStore::disabled(), CacheTtls::default())
    }

    /// Builds the layer described by `config`.
    ///
    /// # Errors
    /// - `ConfigError::Invalid` when the redis backend is requested but the
    ///   crate was built without `redis-cache`, or the URL does not parse.
    pub fn from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.enabled {
            info!("event=cache_init module=cache status=ok backend=noop");
            return Ok(Self::new(CacheStore::disabled(), config.ttl));
        }

        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendKind::Memory => {
                Arc::new(MemoryCacheBackend::with_capacity(config.memory_max_entries))
            }
            CacheBackendKind::Redis => redis_backend(config)?,
        };
        info!(
            "event=cache_init module=cache status=ok backend={}",
            backend.name()
        );
        Ok(Self::new(CacheStore::new(backend), config.ttl))
    }

    pub fn accessor(&self) -> &ReadThroughAccessor {
        &self.accessor
    }

    pub fn invalidation(&self) -> &WriteInvalidation {
        &self.invalidation
    }

    pub fn store(&self) -> &CacheStore {
        self.accessor.store()
    }

    pub fn ttl(&self, entity: CacheEntity) -> Duration {
        self.ttls.for_entity(entity)
    }
}

#[cfg(feature = "redis-cache")]
fn redis_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>, ConfigError> {
    let options = self::redis::RedisPoolOptions {
        max_size: config.redis_pool_size,
        connect_timeout: config.redis_connect_timeout(),
        io_timeout: config.redis_io_timeout(),
    };
    let url = config.redis_url.as_deref().unwrap_or_default();
    let backend = self::redis::RedisCacheBackend::open(url, options)
        .map_err(|err| ConfigError::Invalid(format!("cache.redis_url: {err}")))?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "redis-cache"))]
fn redis_backend(_config: &CacheConfig) -> Result<Arc<dyn CacheBackend>, ConfigError> {
    Err(ConfigError::Invalid(
        "redis cache backend requires the `redis-cache` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::CacheLayer;
    use crate::cache::key::CacheEntity;
    use crate::config::CacheConfig;
    use std::time::Duration;

    #[test]
    fn disabled_config_builds_noop_layer() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let layer = CacheLayer::from_config(&config).unwrap();
        assert_eq!(layer.store().backend_name(), "noop");
        assert_eq!(layer.ttl(CacheEntity::Recipe), Duration::from_secs(43_200));
    }

    #[test]
    fn default_config_uses_memory_backend() {
        let layer = CacheLayer::from_config(&CacheConfig::default()).unwrap();
        assert_eq!(layer.store().backend_name(), "memory");
    }
}
