//! Recipe aggregate: root record, child rows, write inputs and read model.
//!
//! # Responsibility
//! - Define the normalized rows the recipe repository persists.
//! - Define `RecipeView`, the composite read model assembled from those rows
//!   and cached by the recipe service.
//!
//! # Invariants
//! - `RecipeStep::step_index` is 1-based and contiguous per recipe.
//! - A recipe never links the same ingredient or tag twice.
//! - `Recipe::legacy` holds parsed flattened columns only for rows that were
//!   imported before child tables existed.

use crate::model::dictionary::{IngredientId, TagId};
use crate::model::validation::{child, limit_len, positive, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Store-assigned recipe identity.
pub type RecipeId = i64;

pub const TITLE_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

/// Scalar attributes of a recipe root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFields {
    pub title: String,
    pub description: Option<String>,
    /// Minutes.
    pub cooking_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub image_url: Option<String>,
    /// Opaque author reference owned by the user service.
    pub writer_id: String,
    pub ingredients_count: Option<i32>,
    pub kind: Option<String>,
    pub situation: Option<String>,
    pub main_ingredient: Option<String>,
    pub cooking_method: Option<String>,
}

impl RecipeFields {
    pub fn new(title: impl Into<String>, writer_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            writer_id: writer_id.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        limit_len("title", Some(self.title.as_str()), TITLE_MAX_CHARS)?;
        limit_len(
            "description",
            self.description.as_deref(),
            DESCRIPTION_MAX_CHARS,
        )?;
        positive("cooking_time", self.cooking_time)?;
        positive("servings", self.servings)?;
        require_text("writer_id", &self.writer_id)?;
        Ok(())
    }
}

/// Parsed values of the flattened array columns carried by legacy rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyColumns {
    pub instructions: Vec<String>,
    pub ingredients: Vec<String>,
    pub hashtags: Vec<String>,
}

impl LegacyColumns {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.ingredients.is_empty() && self.hashtags.is_empty()
    }
}

/// Raw flattened column text for legacy row import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyRawColumns {
    pub instructions_raw: Option<String>,
    pub ingredients_raw: Option<String>,
    pub hashtags_raw: Option<String>,
}

/// Persisted recipe root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    #[serde(flatten)]
    pub fields: RecipeFields,
    pub view_count: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "LegacyColumns::is_empty")]
    pub legacy: LegacyColumns,
}

/// One step of a write input. The index is derived from position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDraft {
    pub description: String,
    pub image_url: Option<String>,
}

impl StepDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// One ingredient usage of a write input, referenced by dictionary name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientDraft {
    pub ingredient_name: String,
    pub amount: Option<String>,
}

impl IngredientDraft {
    pub fn new(ingredient_name: impl Into<String>, amount: Option<&str>) -> Self {
        Self {
            ingredient_name: ingredient_name.into(),
            amount: amount.map(str::to_string),
        }
    }
}

/// Write input for creating a recipe with all of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub fields: RecipeFields,
    pub steps: Vec<StepDraft>,
    pub ingredients: Vec<IngredientDraft>,
    pub tags: Vec<String>,
}

impl RecipeDraft {
    pub fn new(fields: RecipeFields) -> Self {
        Self {
            fields,
            steps: Vec::new(),
            ingredients: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn step(mut self, step: StepDraft) -> Self {
        self.steps.push(step);
        self
    }

    pub fn ingredient(mut self, name: &str, amount: Option<&str>) -> Self {
        self.ingredients.push(IngredientDraft::new(name, amount));
        self
    }

    pub fn tag(mut self, name: &str) -> Self {
        self.tags.push(name.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.fields.validate()?;
        validate_children(Some(&self.steps), Some(&self.ingredients), Some(&self.tags))
    }
}

/// Write input for updating a recipe.
///
/// Scalars are always replaced. A `Some` child collection replaces the stored
/// collection entirely; `None` leaves it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeUpdate {
    pub fields: RecipeFields,
    pub steps: Option<Vec<StepDraft>>,
    pub ingredients: Option<Vec<IngredientDraft>>,
    pub tags: Option<Vec<String>>,
    /// Nulls the flattened legacy columns in the same write.
    pub clear_legacy_columns: bool,
}

impl RecipeUpdate {
    pub fn scalars(fields: RecipeFields) -> Self {
        Self {
            fields,
            steps: None,
            ingredients: None,
            tags: None,
            clear_legacy_columns: false,
        }
    }

    pub fn replaces_dictionary_links(&self) -> bool {
        self.ingredients.is_some() || self.tags.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.fields.validate()?;
        validate_children(
            self.steps.as_deref(),
            self.ingredients.as_deref(),
            self.tags.as_deref(),
        )
    }
}

fn validate_children(
    steps: Option<&[StepDraft]>,
    ingredients: Option<&[IngredientDraft]>,
    tags: Option<&[String]>,
) -> Result<(), ValidationError> {
    for (position, step) in steps.unwrap_or_default().iter().enumerate() {
        child(
            "steps",
            position,
            require_text("description", &step.description),
        )?;
    }
    for (position, ingredient) in ingredients.unwrap_or_default().iter().enumerate() {
        child(
            "ingredients",
            position,
            require_text("ingredient_name", &ingredient.ingredient_name),
        )?;
    }
    for (position, tag) in tags.unwrap_or_default().iter().enumerate() {
        child("tags", position, require_text("name", tag))?;
    }
    Ok(())
}

/// Trims and deduplicates tag names, keeping first-seen order.
pub fn normalize_tag_names(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_string()))
        .map(str::to_string)
        .collect()
}

/// Persisted ordered child row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeStep {
    pub recipe_id: RecipeId,
    pub step_index: u32,
    pub description: String,
    pub image_url: Option<String>,
}

/// Persisted link from a recipe to an ingredient dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientLink {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub amount: Option<String>,
}

/// Persisted link from a recipe to a tag dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeTagLink {
    pub recipe_id: RecipeId,
    pub tag_id: TagId,
}

/// Composite read model served and cached by the recipe service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeView {
    pub id: RecipeId,
    #[serde(flatten)]
    pub fields: RecipeFields,
    pub view_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
    /// Sorted by `step_index` ascending.
    pub steps: Vec<StepView>,
    pub ingredients: Vec<IngredientView>,
    pub tags: Vec<TagView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub step_index: u32,
    pub description: String,
    pub image_url: Option<String>,
}

/// Ingredient usage. `ingredient_name` is `None` when the dictionary entry is
/// gone; `ingredient_id` is `None` for unnormalized legacy rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientView {
    pub ingredient_id: Option<IngredientId>,
    pub ingredient_name: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagView {
    pub tag_id: Option<TagId>,
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{normalize_tag_names, RecipeDraft, RecipeFields, StepDraft};
    use crate::model::validation::ValidationError;

    #[test]
    fn draft_rejects_blank_step_with_position() {
        let draft = RecipeDraft::new(RecipeFields::new("soup", "writer-1"))
            .step(StepDraft::new("boil"))
            .step(StepDraft::new("   "));

        let err = draft.validate().unwrap_err();
        match err {
            ValidationError::InvalidChild {
                collection,
                position,
                ..
            } => {
                assert_eq!(collection, "steps");
                assert_eq!(position, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fields_reject_non_positive_servings() {
        let mut fields = RecipeFields::new("soup", "writer-1");
        fields.servings = Some(0);
        assert_eq!(
            fields.validate().unwrap_err(),
            ValidationError::NotPositive("servings")
        );
    }

    #[test]
    fn tag_names_are_trimmed_and_deduplicated_in_order() {
        let tags = vec![
            " quick ".to_string(),
            "vegan".to_string(),
            "quick".to_string(),
        ];
        assert_eq!(normalize_tag_names(&tags), vec!["quick", "vegan"]);
    }
}
