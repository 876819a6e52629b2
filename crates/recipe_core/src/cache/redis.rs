//! Redis cache backend (feature `redis-cache`).
//!
//! Connections come from an `r2d2` pool opened lazily. Each call checks out
//! one connection, waiting at most the connect timeout, and makes a single
//! attempt; failures surface as `CacheError` for the fail-open adapter to
//! absorb.

use crate::cache::backend::{CacheBackend, CacheError, CacheResult};
use r2d2::{Pool, PooledConnection};
use redis::Commands;
use std::time::Duration;

/// Pool sizing and per-call timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedisPoolOptions {
    pub max_size: u32,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl Default for RedisPoolOptions {
    fn default() -> Self {
        Self {
            max_size: 8,
            connect_timeout: Duration::from_millis(250),
            io_timeout: Duration::from_millis(500),
        }
    }
}

pub struct RedisCacheBackend {
    pool: Pool<redis::Client>,
    io_timeout: Duration,
}

impl RedisCacheBackend {
    /// Parses `url` (e.g. `redis://localhost:6379`) and sizes the pool.
    /// Does not connect.
    pub fn open(url: &str, options: RedisPoolOptions) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(backend_error)?;
        let pool = Pool::builder()
            .max_size(options.max_size)
            .min_idle(Some(0))
            .connection_timeout(options.connect_timeout)
            .test_on_check_out(false)
            .build_unchecked(client);
        Ok(Self {
            pool,
            io_timeout: options.io_timeout,
        })
    }

    fn connection(&self) -> CacheResult<PooledConnection<redis::Client>> {
        let conn = self
            .pool
            .get()
            .map_err(|err| CacheError::Unavailable(err.to_string()))?;
        conn.set_read_timeout(Some(self.io_timeout))
            .map_err(backend_error)?;
        conn.set_write_timeout(Some(self.io_timeout))
            .map_err(backend_error)?;
        Ok(conn)
    }
}

impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection()?;
        conn.get::<_, Option<Vec<u8>>>(key).map_err(backend_error)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection()?;
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .map_err(backend_error)
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection()?;
        conn.del::<_, u64>(key)
            .map(|removed| removed > 0)
            .map_err(backend_error)
    }

    fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut conn = self.connection()?;
        let pattern = format!("{}*", escape_glob(prefix));
        let keys: Vec<String> = conn
            .scan_match::<_, String>(pattern)
            .map_err(backend_error)?
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }
        conn.del::<_, u64>(keys).map_err(backend_error)
    }
}

fn backend_error(err: redis::RedisError) -> CacheError {
    if err.is_timeout() || err.is_connection_refusal() || err.is_io_error() {
        CacheError::Unavailable(err.to_string())
    } else {
        CacheError::Backend(err.to_string())
    }
}

/// Escapes Redis glob metacharacters so `prefix` matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
