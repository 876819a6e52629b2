//! Recipe use-case service.
//!
//! # Responsibility
//! - Serve assembled recipe views through the read-through cache.
//! - Run recipe writes against the repository and evict affected keys after
//!   commit.
//! - Promote legacy flattened columns into normalized child rows.
//!
//! # Invariants
//! - Views are assembled from one root query, one query per child table and
//!   one dictionary query, regardless of list length.
//! - Writes read back from the store, never from the cache.
//! - Keyword searches bypass the cache.

use crate::assemble::recipe_assembler::{assemble_recipes, RecipeChildren};
use crate::cache::key::{CacheEntity, CacheKey};
use crate::cache::CacheLayer;
use crate::model::dictionary::Tag;
use crate::model::recipe::{
    IngredientDraft, LegacyRawColumns, Recipe, RecipeDraft, RecipeFields, RecipeId, RecipeUpdate,
    RecipeView, StepDraft,
};
use crate::model::validation::ValidationError;
use crate::repo::recipe_repo::{RecipeFilter, RecipeListQuery, RecipeOrder, RecipeRepository};
use crate::repo::Page;
use crate::service::error::{ServiceError, ServiceResult};
use log::info;

/// Recipe service facade over repository implementations.
pub struct RecipeService<R: RecipeRepository> {
    repo: R,
    cache: CacheLayer,
}

impl<R: RecipeRepository> RecipeService<R> {
    pub fn new(repo: R, cache: CacheLayer) -> Self {
        Self { repo, cache }
    }

    /// Creates a recipe with its steps, ingredient links and tags.
    ///
    /// Ingredient and tag names missing from the dictionaries are created in
    /// the same transaction.
    pub fn create_recipe(&mut self, draft: &RecipeDraft) -> ServiceResult<RecipeView> {
        let id = self.repo.create_recipe(draft)?;

        let invalidation = self.cache.invalidation();
        invalidation.after_create(CacheEntity::Recipe);
        if !draft.ingredients.is_empty() {
            invalidation.evict_lists(CacheEntity::Ingredient);
        }
        if !draft.tags.is_empty() {
            invalidation.evict_lists(CacheEntity::Tag);
        }

        self.load_view(id)?.ok_or(ServiceError::InconsistentState(
            "created recipe not found in read-back",
        ))
    }

    /// Gets one assembled recipe by id.
    pub fn get_recipe(&self, id: RecipeId) -> ServiceResult<RecipeView> {
        self.cache.accessor().get_or_load(
            &CacheKey::item(CacheEntity::Recipe, id),
            self.cache.ttl(CacheEntity::Recipe),
            || {
                self.load_view(id)?
                    .ok_or_else(|| ServiceError::not_found("recipe", id))
            },
        )
    }

    /// Every recipe, newest first.
    pub fn list_recipes(&self) -> ServiceResult<Vec<RecipeView>> {
        let query = RecipeListQuery::default();
        self.cache.accessor().get_or_load(
            &CacheKey::list(CacheEntity::Recipe),
            self.cache.ttl(CacheEntity::Recipe),
            || self.load_views(&query),
        )
    }

    /// One page of recipes, newest first.
    pub fn list_recent_recipes(&self, page: Page) -> ServiceResult<Vec<RecipeView>> {
        self.list_cached(RecipeListQuery::new(
            RecipeFilter::All,
            RecipeOrder::Newest,
            Some(page),
        ))
    }

    /// Most viewed recipes; `limit` follows list limit normalization.
    pub fn list_top_recipes(&self, limit: u32) -> ServiceResult<Vec<RecipeView>> {
        self.list_cached(RecipeListQuery::new(
            RecipeFilter::All,
            RecipeOrder::MostViewed,
            Some(Page::first(limit)),
        ))
    }

    pub fn list_recipes_by_writer(&self, writer_id: &str) -> ServiceResult<Vec<RecipeView>> {
        self.list_cached(RecipeListQuery::new(
            RecipeFilter::Writer(writer_id.to_string()),
            RecipeOrder::Newest,
            None,
        ))
    }

    pub fn list_recipes_by_difficulty(&self, difficulty: &str) -> ServiceResult<Vec<RecipeView>> {
        self.list_cached(RecipeListQuery::new(
            RecipeFilter::Difficulty(difficulty.trim().to_lowercase()),
            RecipeOrder::Newest,
            None,
        ))
    }

    /// Recipes whose cooking time is known and at most `minutes`.
    pub fn list_recipes_by_max_cooking_time(
        &self,
        minutes: i32,
    ) -> ServiceResult<Vec<RecipeView>> {
        if minutes <= 0 {
            return Err(ValidationError::NotPositive("cooking_time").into());
        }
        self.list_cached(RecipeListQuery::new(
            RecipeFilter::MaxCookingTime(minutes),
            RecipeOrder::Newest,
            None,
        ))
    }

    /// Title or description substring search. Never cached.
    pub fn search_recipes(&self, keyword: &str) -> ServiceResult<Vec<RecipeView>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ValidationError::EmptyField("keyword").into());
        }
        self.load_views(&RecipeListQuery::new(
            RecipeFilter::Keyword(keyword.to_string()),
            RecipeOrder::Newest,
            None,
        ))
    }

    pub fn count_recipes_by_writer(&self, writer_id: &str) -> ServiceResult<u64> {
        Ok(self.repo.count_recipes_by_writer(writer_id)?)
    }

    /// Replaces scalars and every child collection present in `update`.
    pub fn update_recipe(
        &mut self,
        id: RecipeId,
        update: &RecipeUpdate,
    ) -> ServiceResult<RecipeView> {
        self.repo.update_recipe(id, update)?;
        self.evict_after_update(id, update);

        self.load_view(id)?.ok_or(ServiceError::InconsistentState(
            "updated recipe not found in read-back",
        ))
    }

    pub fn delete_recipe(&mut self, id: RecipeId) -> ServiceResult<()> {
        if !self.repo.recipe_exists(id)? {
            return Err(ServiceError::not_found("recipe", id));
        }
        self.repo.delete_recipe(id)?;
        self.cache
            .invalidation()
            .after_delete(CacheEntity::Recipe, id, &[]);
        Ok(())
    }

    /// Stores a recipe row carrying only flattened legacy columns.
    ///
    /// The returned view is backed by the parsed legacy values until
    /// [`Self::normalize_legacy_recipe`] promotes them.
    pub fn import_legacy_recipe(
        &mut self,
        fields: &RecipeFields,
        raw: &LegacyRawColumns,
    ) -> ServiceResult<RecipeView> {
        let id = self.repo.import_legacy_recipe(fields, raw)?;
        self.cache.invalidation().after_create(CacheEntity::Recipe);

        self.load_view(id)?.ok_or(ServiceError::InconsistentState(
            "imported recipe not found in read-back",
        ))
    }

    /// Writes parsed legacy values as normalized child rows and clears the
    /// flattened columns.
    ///
    /// Collections that already have normalized rows are left untouched.
    pub fn normalize_legacy_recipe(&mut self, id: RecipeId) -> ServiceResult<RecipeView> {
        let root = self
            .repo
            .get_recipe(id)?
            .ok_or_else(|| ServiceError::not_found("recipe", id))?;
        let children = self.repo.load_children(&[id])?;
        let update = legacy_promotion(&root, &children);

        self.repo.update_recipe(id, &update)?;
        self.evict_after_update(id, &update);
        info!(
            "event=legacy_normalize module=service status=ok recipe_id={} steps={} ingredients={} tags={}",
            id,
            update.steps.as_ref().map_or(0, Vec::len),
            update.ingredients.as_ref().map_or(0, Vec::len),
            update.tags.as_ref().map_or(0, Vec::len)
        );

        self.load_view(id)?.ok_or(ServiceError::InconsistentState(
            "normalized recipe not found in read-back",
        ))
    }

    /// Tag dictionary sorted by name.
    pub fn list_tags(&self) -> ServiceResult<Vec<Tag>> {
        self.cache.accessor().get_or_load(
            &CacheKey::list(CacheEntity::Tag),
            self.cache.ttl(CacheEntity::Tag),
            || Ok(self.repo.list_tags()?),
        )
    }

    fn list_cached(&self, query: RecipeListQuery) -> ServiceResult<Vec<RecipeView>> {
        match query.cache_qualifier() {
            Some(qualifier) => self.cache.accessor().get_or_load(
                &CacheKey::qualified_list(CacheEntity::Recipe, &qualifier),
                self.cache.ttl(CacheEntity::Recipe),
                || self.load_views(&query),
            ),
            None => self.load_views(&query),
        }
    }

    fn evict_after_update(&self, id: RecipeId, update: &RecipeUpdate) {
        let invalidation = self.cache.invalidation();
        invalidation.after_update(CacheEntity::Recipe, id, &[]);
        if update.ingredients.is_some() {
            invalidation.evict_lists(CacheEntity::Ingredient);
        }
        if update.tags.is_some() {
            invalidation.evict_lists(CacheEntity::Tag);
        }
    }

    fn load_view(&self, id: RecipeId) -> ServiceResult<Option<RecipeView>> {
        let Some(root) = self.repo.get_recipe(id)? else {
            return Ok(None);
        };
        Ok(self.assemble(vec![root])?.pop())
    }

    fn load_views(&self, query: &RecipeListQuery) -> ServiceResult<Vec<RecipeView>> {
        let roots = self.repo.list_recipes(query)?;
        self.assemble(roots)
    }

    fn assemble(&self, roots: Vec<Recipe>) -> ServiceResult<Vec<RecipeView>> {
        if roots.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<RecipeId> = roots.iter().map(|root| root.id).collect();
        let children = self.repo.load_children(&ids)?;
        let (ingredient_ids, tag_ids) = children.dictionary_ids();
        let snapshot = self.repo.load_dictionary(&ingredient_ids, &tag_ids)?;
        Ok(assemble_recipes(&roots, children, &snapshot))
    }
}

fn legacy_promotion(root: &Recipe, children: &RecipeChildren) -> RecipeUpdate {
    let legacy = &root.legacy;
    let mut update = RecipeUpdate::scalars(root.fields.clone());
    if children.steps.is_empty() && !legacy.instructions.is_empty() {
        update.steps = Some(
            legacy
                .instructions
                .iter()
                .map(|text| StepDraft::new(text.as_str()))
                .collect(),
        );
    }
    if children.ingredients.is_empty() && !legacy.ingredients.is_empty() {
        update.ingredients = Some(
            legacy
                .ingredients
                .iter()
                .map(|name| IngredientDraft::new(name.as_str(), None))
                .collect(),
        );
    }
    if children.tags.is_empty() && !legacy.hashtags.is_empty() {
        update.tags = Some(legacy.hashtags.clone());
    }
    update.clear_legacy_columns = true;
    update
}
