//! Ingredient catalog service.
//!
//! Ingredient names are embedded in cached recipe views, so renaming or
//! deleting an ingredient also drops every cached recipe key.

use crate::cache::key::{CacheEntity, CacheKey};
use crate::cache::CacheLayer;
use crate::model::dictionary::{Ingredient, IngredientId, IngredientInput};
use crate::model::validation::ValidationError;
use crate::repo::ingredient_repo::{IngredientFilter, IngredientListQuery, IngredientRepository};
use crate::service::error::{ServiceError, ServiceResult};

pub struct IngredientService<R: IngredientRepository> {
    repo: R,
    cache: CacheLayer,
}

impl<R: IngredientRepository> IngredientService<R> {
    pub fn new(repo: R, cache: CacheLayer) -> Self {
        Self { repo, cache }
    }

    /// Adds a catalog entry. Fails with `Conflict` when the name is taken.
    pub fn create_ingredient(&self, input: &IngredientInput) -> ServiceResult<Ingredient> {
        let id = self.repo.create_ingredient(input)?;
        self.cache
            .invalidation()
            .after_create(CacheEntity::Ingredient);
        self.repo
            .get_ingredient(id)?
            .ok_or(ServiceError::InconsistentState(
                "created ingredient not found in read-back",
            ))
    }

    pub fn get_ingredient(&self, id: IngredientId) -> ServiceResult<Ingredient> {
        self.cache.accessor().get_or_load(
            &CacheKey::item(CacheEntity::Ingredient, id),
            self.cache.ttl(CacheEntity::Ingredient),
            || {
                self.repo
                    .get_ingredient(id)?
                    .ok_or_else(|| ServiceError::not_found("ingredient", id))
            },
        )
    }

    /// Every ingredient sorted by name.
    pub fn list_ingredients(&self) -> ServiceResult<Vec<Ingredient>> {
        let query = IngredientListQuery::default();
        self.cache.accessor().get_or_load(
            &CacheKey::list(CacheEntity::Ingredient),
            self.cache.ttl(CacheEntity::Ingredient),
            || Ok(self.repo.list_ingredients(&query)?),
        )
    }

    pub fn list_ingredients_by_category(&self, category: &str) -> ServiceResult<Vec<Ingredient>> {
        self.list_cached(IngredientListQuery::new(
            IngredientFilter::Category(category.trim().to_lowercase()),
            None,
        ))
    }

    pub fn list_in_stock_ingredients(&self) -> ServiceResult<Vec<Ingredient>> {
        self.list_cached(IngredientListQuery::new(IngredientFilter::InStock, None))
    }

    /// Ingredients priced within `min_cents..=max_cents`.
    pub fn list_ingredients_by_price_range(
        &self,
        min_cents: i64,
        max_cents: i64,
    ) -> ServiceResult<Vec<Ingredient>> {
        if min_cents < 0 {
            return Err(ValidationError::Negative("price_cents").into());
        }
        if min_cents > max_cents {
            return Err(ValidationError::InvalidRange("price_cents").into());
        }
        self.list_cached(IngredientListQuery::new(
            IngredientFilter::PriceRange {
                min_cents,
                max_cents,
            },
            None,
        ))
    }

    /// Name substring search. Never cached.
    pub fn search_ingredients(&self, keyword: &str) -> ServiceResult<Vec<Ingredient>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ValidationError::EmptyField("keyword").into());
        }
        Ok(self.repo.list_ingredients(&IngredientListQuery::new(
            IngredientFilter::Keyword(keyword.to_string()),
            None,
        ))?)
    }

    pub fn count_in_stock(&self) -> ServiceResult<u64> {
        Ok(self.repo.count_in_stock()?)
    }

    pub fn update_ingredient(
        &self,
        id: IngredientId,
        input: &IngredientInput,
    ) -> ServiceResult<Ingredient> {
        self.repo.update_ingredient(id, input)?;
        let invalidation = self.cache.invalidation();
        invalidation.after_update(CacheEntity::Ingredient, id, &[]);
        invalidation.evict_entity(CacheEntity::Recipe);

        self.repo
            .get_ingredient(id)?
            .ok_or(ServiceError::InconsistentState(
                "updated ingredient not found in read-back",
            ))
    }

    /// Removes the catalog entry. Recipe links stay and read back unnamed.
    pub fn delete_ingredient(&self, id: IngredientId) -> ServiceResult<()> {
        self.repo.delete_ingredient(id)?;
        let invalidation = self.cache.invalidation();
        invalidation.after_delete(CacheEntity::Ingredient, id, &[]);
        invalidation.evict_entity(CacheEntity::Recipe);
        Ok(())
    }

    fn list_cached(&self, query: IngredientListQuery) -> ServiceResult<Vec<Ingredient>> {
        match query.cache_qualifier() {
            Some(qualifier) => self.cache.accessor().get_or_load(
                &CacheKey::qualified_list(CacheEntity::Ingredient, &qualifier),
                self.cache.ttl(CacheEntity::Ingredient),
                || Ok(self.repo.list_ingredients(&query)?),
            ),
            None => Ok(self.repo.list_ingredients(&query)?),
        }
    }
}
