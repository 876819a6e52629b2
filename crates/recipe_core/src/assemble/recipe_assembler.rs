//! Joins recipe roots with their child rows into `RecipeView`s.
//!
//! # Invariants
//! - Steps come out sorted by `step_index`; indexes are never renumbered.
//! - A dictionary id absent from the snapshot yields a `None` name, not an
//!   error.
//! - A collection with no normalized rows falls back to the root's parsed
//!   legacy values, if any.
//! - Batch output preserves root order.

use crate::model::dictionary::{IngredientId, TagId};
use crate::model::recipe::{
    IngredientView, Recipe, RecipeId, RecipeIngredientLink, RecipeStep, RecipeTagLink,
    RecipeView, StepView, TagView,
};
use std::collections::HashMap;

/// Dictionary names resolved once per batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionarySnapshot {
    pub ingredients: HashMap<IngredientId, String>,
    pub tags: HashMap<TagId, String>,
}

impl DictionarySnapshot {
    pub fn ingredient_name(&self, id: IngredientId) -> Option<&str> {
        self.ingredients.get(&id).map(String::as_str)
    }

    pub fn tag_name(&self, id: TagId) -> Option<&str> {
        self.tags.get(&id).map(String::as_str)
    }
}

/// Child rows of one or more recipes, as loaded by the batch finders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeChildren {
    pub steps: Vec<RecipeStep>,
    pub ingredients: Vec<RecipeIngredientLink>,
    pub tags: Vec<RecipeTagLink>,
}

impl RecipeChildren {
    /// Splits batch-loaded rows by parent recipe id.
    pub fn partition_by_recipe(self) -> HashMap<RecipeId, RecipeChildren> {
        let mut by_recipe: HashMap<RecipeId, RecipeChildren> = HashMap::new();
        for step in self.steps {
            by_recipe.entry(step.recipe_id).or_default().steps.push(step);
        }
        for link in self.ingredients {
            by_recipe
                .entry(link.recipe_id)
                .or_default()
                .ingredients
                .push(link);
        }
        for link in self.tags {
            by_recipe.entry(link.recipe_id).or_default().tags.push(link);
        }
        by_recipe
    }

    /// Ingredient and tag ids referenced by these rows, deduplicated.
    pub fn dictionary_ids(&self) -> (Vec<IngredientId>, Vec<TagId>) {
        let mut ingredient_ids: Vec<IngredientId> = self
            .ingredients
            .iter()
            .map(|link| link.ingredient_id)
            .collect();
        ingredient_ids.sort_unstable();
        ingredient_ids.dedup();
        let mut tag_ids: Vec<TagId> = self.tags.iter().map(|link| link.tag_id).collect();
        tag_ids.sort_unstable();
        tag_ids.dedup();
        (ingredient_ids, tag_ids)
    }
}

pub fn assemble_recipe(
    root: &Recipe,
    mut children: RecipeChildren,
    snapshot: &DictionarySnapshot,
) -> RecipeView {
    children.steps.sort_by_key(|step| step.step_index);

    let steps = if children.steps.is_empty() {
        legacy_steps(root)
    } else {
        children
            .steps
            .into_iter()
            .map(|step| StepView {
                step_index: step.step_index,
                description: step.description,
                image_url: step.image_url,
            })
            .collect()
    };

    let ingredients = if children.ingredients.is_empty() {
        root.legacy
            .ingredients
            .iter()
            .map(|name| IngredientView {
                ingredient_id: None,
                ingredient_name: Some(name.clone()),
                amount: None,
            })
            .collect()
    } else {
        children
            .ingredients
            .into_iter()
            .map(|link| IngredientView {
                ingredient_id: Some(link.ingredient_id),
                ingredient_name: snapshot.ingredient_name(link.ingredient_id).map(str::to_string),
                amount: link.amount,
            })
            .collect()
    };

    let tags = if children.tags.is_empty() {
        root.legacy
            .hashtags
            .iter()
            .map(|name| TagView {
                tag_id: None,
                name: Some(name.clone()),
            })
            .collect()
    } else {
        children
            .tags
            .into_iter()
            .map(|link| TagView {
                tag_id: Some(link.tag_id),
                name: snapshot.tag_name(link.tag_id).map(str::to_string),
            })
            .collect()
    };

    RecipeView {
        id: root.id,
        fields: root.fields.clone(),
        view_count: root.view_count,
        created_at: root.created_at,
        updated_at: root.updated_at,
        steps,
        ingredients,
        tags,
    }
}

/// Assembles many roots from one batch of children and one snapshot.
pub fn assemble_recipes(
    roots: &[Recipe],
    children: RecipeChildren,
    snapshot: &DictionarySnapshot,
) -> Vec<RecipeView> {
    let mut by_recipe = children.partition_by_recipe();
    roots
        .iter()
        .map(|root| {
            let own = by_recipe.remove(&root.id).unwrap_or_default();
            assemble_recipe(root, own, snapshot)
        })
        .collect()
}

fn legacy_steps(root: &Recipe) -> Vec<StepView> {
    root.legacy
        .instructions
        .iter()
        .zip(1u32..)
        .map(|(description, step_index)| StepView {
            step_index,
            description: description.clone(),
            image_url: None,
        })
        .collect()
}
