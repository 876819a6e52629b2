//! Entity use-case services.
//!
//! # Responsibility
//! - Route reads through the read-through cache and writes through the
//!   repositories.
//! - Apply post-commit eviction for every write.
//!
//! # Invariants
//! - Cache failures degrade to store reads and never surface as errors.
//! - Eviction runs only after the repository call returned `Ok`.

pub mod board_service;
pub mod error;
pub mod ingredient_service;
pub mod recipe_service;
pub mod user_service;

pub use error::{ServiceError, ServiceResult};
