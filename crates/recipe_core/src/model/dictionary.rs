//! Name-keyed dictionary entities referenced from recipe link tables.
//!
//! # Invariants
//! - `name` is unique per dictionary and stored trimmed.
//! - Dictionary rows may be deleted while links still reference them.

use crate::model::validation::{limit_len, require_text, ValidationError};
use serde::{Deserialize, Serialize};

pub type IngredientId = i64;
pub type TagId = i64;

pub const NAME_MAX_CHARS: usize = 120;

/// Ingredient dictionary entry with optional catalog attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub category: Option<String>,
    /// Unit price in minor currency units.
    pub price_cents: Option<i64>,
    pub in_stock: bool,
    pub stock_quantity: i64,
    pub image_url: Option<String>,
    pub supplier: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Write input for ingredient catalog create/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientInput {
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub in_stock: bool,
    pub stock_quantity: i64,
    pub image_url: Option<String>,
    pub supplier: Option<String>,
}

impl IngredientInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            unit: None,
            category: None,
            price_cents: None,
            in_stock: true,
            stock_quantity: 0,
            image_url: None,
            supplier: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        limit_len("name", Some(self.name.trim()), NAME_MAX_CHARS)?;
        if self.price_cents.is_some_and(|price| price < 0) {
            return Err(ValidationError::Negative("price_cents"));
        }
        if self.stock_quantity < 0 {
            return Err(ValidationError::Negative("stock_quantity"));
        }
        Ok(())
    }
}

/// Tag dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}
