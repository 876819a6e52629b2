//! Core domain logic for the recipe platform.
//! Cache-aside reads, post-commit eviction and aggregate assembly over a
//! SQLite source of truth.

pub mod assemble;
pub mod cache;
pub mod config;
pub mod db;
pub mod legacy;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cache::key::{CacheEntity, CacheKey};
pub use cache::store::{CacheStats, CacheStore};
pub use cache::CacheLayer;
pub use config::{CacheConfig, CoreConfig};
pub use db::{open_db, open_db_in_memory};
pub use legacy::array_field::{parse_legacy_array, parse_legacy_list, LegacyColumn};
pub use logging::{default_log_level, init_logging, logging_status};
pub use repo::{Page, RepoError, RepoResult};
pub use service::board_service::BoardPostService;
pub use service::ingredient_service::IngredientService;
pub use service::recipe_service::RecipeService;
pub use service::user_service::UserService;
pub use service::{ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
