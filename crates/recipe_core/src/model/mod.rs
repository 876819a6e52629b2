//! Domain model for recipes, dictionaries, users and board posts.
//!
//! # Responsibility
//! - Define the records persisted by repositories and the read models served
//!   (and cached) by services.
//! - Validate write inputs before they reach persistence.
//!
//! # Invariants
//! - Every persisted entity is identified by a store-assigned numeric id.
//! - Dictionary entities (`Ingredient`, `Tag`) are unique by name.
//! - Recipe steps are 1-based and contiguous in input order.

pub mod board_post;
pub mod dictionary;
pub mod recipe;
pub mod user;
pub mod validation;
