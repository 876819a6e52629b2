//! Raw cache client contract.
//!
//! Backends report every failure as `CacheError`. They are never called
//! directly by services; `CacheStore` wraps them and absorbs the errors.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Backend could not be reached (connect, pool checkout or timeout).
    Unavailable(String),
    /// Backend answered with an error.
    Backend(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "cache unavailable: {message}"),
            Self::Backend(message) => write!(f, "cache backend error: {message}"),
        }
    }
}

impl Error for CacheError {}

/// Key/value client with per-key time-to-live.
///
/// Implementations make a single attempt per call and must be shareable
/// across request threads.
pub trait CacheBackend: Send + Sync {
    /// Short backend label used in log events.
    fn name(&self) -> &'static str;
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;
    /// Returns whether a key was removed.
    fn delete(&self, key: &str) -> CacheResult<bool>;
    /// Returns the number of removed keys.
    fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64>;
}

/// Backend used when caching is disabled: every read misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheBackend;

impl CacheBackend for NoopCacheBackend {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    fn delete_by_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Ok(0)
    }
}
