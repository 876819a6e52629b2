//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe logging, storage and cache settings in one serde model.
//! - Load that model from JSON and reject unusable values early.
//!
//! # Invariants
//! - Every field has a default, so `{}` is a valid configuration.
//! - Every TTL is strictly positive.

use crate::cache::key::CacheEntity;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// SQLite file path. `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    pub cache: CacheConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            database_path: None,
            cache: CacheConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        self.cache.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackendKind,
    /// Resident key bound for the memory backend.
    pub memory_max_entries: u64,
    /// Required when `backend` is `redis`.
    pub redis_url: Option<String>,
    pub redis_pool_size: u32,
    pub redis_connect_timeout_ms: u64,
    pub redis_io_timeout_ms: u64,
    pub ttl: CacheTtls,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            memory_max_entries: 10_000,
            redis_url: None,
            redis_pool_size: 8,
            redis_connect_timeout_ms: 250,
            redis_io_timeout_ms: 500,
            ttl: CacheTtls::default(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled
            && self.backend == CacheBackendKind::Redis
            && self
                .redis_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "cache.redis_url is required for the redis backend".to_string(),
            ));
        }
        let bounds = [
            ("memory_max_entries", self.memory_max_entries),
            ("redis_pool_size", u64::from(self.redis_pool_size)),
            ("redis_connect_timeout_ms", self.redis_connect_timeout_ms),
            ("redis_io_timeout_ms", self.redis_io_timeout_ms),
        ];
        if let Some((name, _)) = bounds.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("cache.{name} must be positive")));
        }
        self.ttl.validate()
    }

    pub fn redis_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_connect_timeout_ms)
    }

    pub fn redis_io_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_io_timeout_ms)
    }
}

/// Per-entity time-to-live, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub user_secs: u64,
    pub recipe_secs: u64,
    pub ingredient_secs: u64,
    pub tag_secs: u64,
    pub board_post_secs: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            user_secs: 24 * 60 * 60,
            recipe_secs: 12 * 60 * 60,
            ingredient_secs: 6 * 60 * 60,
            tag_secs: 12 * 60 * 60,
            board_post_secs: 2 * 60 * 60,
        }
    }
}

impl CacheTtls {
    pub fn for_entity(&self, entity: CacheEntity) -> Duration {
        let secs = match entity {
            CacheEntity::User => self.user_secs,
            CacheEntity::Recipe => self.recipe_secs,
            CacheEntity::Ingredient => self.ingredient_secs,
            CacheEntity::Tag => self.tag_secs,
            CacheEntity::BoardPost => self.board_post_secs,
        };
        Duration::from_secs(secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let entries = [
            ("user_secs", self.user_secs),
            ("recipe_secs", self.recipe_secs),
            ("ingredient_secs", self.ingredient_secs),
            ("tag_secs", self.tag_secs),
            ("board_post_secs", self.board_post_secs),
        ];
        match entries.iter().find(|(_, secs)| *secs == 0) {
            Some((name, _)) => Err(ConfigError::Invalid(format!(
                "cache.ttl.{name} must be positive"
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheBackendKind, ConfigError, CoreConfig};
    use crate::cache::key::CacheEntity;
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
        assert_eq!(
            config.cache.ttl.for_entity(CacheEntity::BoardPost),
            Duration::from_secs(7200)
        );
        assert_eq!(
            config.cache.ttl.for_entity(CacheEntity::User),
            Duration::from_secs(86_400)
        );
    }

    #[test]
    fn partial_ttl_override_keeps_other_defaults() {
        let config =
            CoreConfig::from_json_str(r#"{"cache": {"ttl": {"recipe_secs": 60}}}"#).unwrap();
        assert_eq!(config.cache.ttl.recipe_secs, 60);
        assert_eq!(config.cache.ttl.ingredient_secs, 21_600);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{"cache": {"ttl": {"tag_secs": 0}}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("tag_secs")));
    }

    #[test]
    fn redis_backend_requires_url() {
        let err = CoreConfig::from_json_str(r#"{"cache": {"backend": "redis"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let err =
            CoreConfig::from_json_str(r#"{"cache": {"redis_pool_size": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("redis_pool_size")));
    }

    #[test]
    fn redis_timeouts_come_from_millis() {
        let config = CoreConfig::from_json_str(
            r#"{"cache": {"redis_connect_timeout_ms": 100, "memory_max_entries": 64}}"#,
        )
        .unwrap();
        assert_eq!(config.cache.redis_connect_timeout(), Duration::from_millis(100));
        assert_eq!(config.cache.redis_io_timeout(), Duration::from_millis(500));
        assert_eq!(config.cache.memory_max_entries, 64);
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{"log_dir": "logs"}"#).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }
}
