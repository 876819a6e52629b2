//! Recipe aggregate repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist recipe roots together with steps, ingredient links and tag
//!   links in one transaction.
//! - Provide batch child finders keyed by parent id lists.
//! - Decode flattened legacy columns while reading root rows.
//!
//! # Invariants
//! - Step indexes are assigned `1..=n` from input order on every write.
//! - Ingredient and tag links are deduplicated per recipe; the first
//!   occurrence of a dictionary entry wins.
//! - Deleting a root cascades to every child row.

use crate::assemble::recipe_assembler::{DictionarySnapshot, RecipeChildren};
use crate::legacy::parse_legacy_columns;
use crate::model::dictionary::{IngredientId, Tag, TagId};
use crate::model::recipe::{
    normalize_tag_names, IngredientDraft, LegacyColumns, LegacyRawColumns, Recipe, RecipeDraft,
    RecipeFields, RecipeId, RecipeIngredientLink, RecipeStep, RecipeTagLink, RecipeUpdate,
    StepDraft,
};
use crate::repo::dictionary::{self, placeholders, DictionaryKind, ID_CHUNK_SIZE};
use crate::repo::{
    ensure_connection_ready, like_contains_pattern, page_qualifier, push_page, Page, RepoError,
    RepoResult,
};
use log::info;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::collections::HashSet;

const RECIPE_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    cooking_time,
    servings,
    difficulty,
    image_url,
    writer_id,
    ingredients_count,
    kind,
    situation,
    main_ingredient,
    cooking_method,
    view_count,
    created_at,
    updated_at,
    instructions_raw,
    ingredients_raw,
    hashtags_raw
FROM recipes";

const REQUIRED_TABLES: &[&str] = &[
    "recipes",
    "recipe_step",
    "recipe_ingredient",
    "recipe_tag",
    "ingredients",
    "tags",
];

/// Root-level predicate for recipe list queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecipeFilter {
    #[default]
    All,
    Writer(String),
    Difficulty(String),
    /// Cooking time at most this many minutes.
    MaxCookingTime(i32),
    /// Case-insensitive substring of title or description.
    Keyword(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecipeOrder {
    /// `created_at DESC, id DESC`
    #[default]
    Newest,
    /// `view_count DESC, created_at DESC, id DESC`
    MostViewed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeListQuery {
    pub filter: RecipeFilter,
    pub order: RecipeOrder,
    /// `None` returns every matching row.
    pub page: Option<Page>,
}

impl RecipeListQuery {
    pub fn new(filter: RecipeFilter, order: RecipeOrder, page: Option<Page>) -> Self {
        Self {
            filter,
            order,
            page,
        }
    }

    /// Qualifier for `recipe:list:<qualifier>` keys. Keyword searches have
    /// none and are not cached.
    pub fn cache_qualifier(&self) -> Option<String> {
        let filter = match &self.filter {
            RecipeFilter::All => "all".to_string(),
            RecipeFilter::Writer(writer_id) => format!("writer:{writer_id}"),
            RecipeFilter::Difficulty(difficulty) => format!("difficulty:{difficulty}"),
            RecipeFilter::MaxCookingTime(minutes) => format!("max_time:{minutes}"),
            RecipeFilter::Keyword(_) => return None,
        };
        let order = match self.order {
            RecipeOrder::Newest => "newest",
            RecipeOrder::MostViewed => "top",
        };
        Some(format!("{filter}:{order}:{}", page_qualifier(self.page)))
    }
}

/// Repository interface for the recipe aggregate.
pub trait RecipeRepository {
    /// Inserts root and children in one transaction; returns the new id.
    fn create_recipe(&mut self, draft: &RecipeDraft) -> RepoResult<RecipeId>;
    /// Replaces scalars and every `Some` child collection in one transaction.
    fn update_recipe(&mut self, id: RecipeId, update: &RecipeUpdate) -> RepoResult<()>;
    /// Deletes the root; children cascade.
    fn delete_recipe(&mut self, id: RecipeId) -> RepoResult<()>;
    /// Inserts a root carrying only flattened legacy columns.
    fn import_legacy_recipe(
        &mut self,
        fields: &RecipeFields,
        raw: &LegacyRawColumns,
    ) -> RepoResult<RecipeId>;
    fn get_recipe(&self, id: RecipeId) -> RepoResult<Option<Recipe>>;
    fn recipe_exists(&self, id: RecipeId) -> RepoResult<bool>;
    fn list_recipes(&self, query: &RecipeListQuery) -> RepoResult<Vec<Recipe>>;
    fn count_recipes_by_writer(&self, writer_id: &str) -> RepoResult<u64>;
    /// Steps of every listed recipe, ordered by recipe then step index.
    fn steps_for_recipes(&self, ids: &[RecipeId]) -> RepoResult<Vec<RecipeStep>>;
    fn ingredient_links_for_recipes(
        &self,
        ids: &[RecipeId],
    ) -> RepoResult<Vec<RecipeIngredientLink>>;
    fn tag_links_for_recipes(&self, ids: &[RecipeId]) -> RepoResult<Vec<RecipeTagLink>>;
    fn load_dictionary(
        &self,
        ingredient_ids: &[IngredientId],
        tag_ids: &[TagId],
    ) -> RepoResult<DictionarySnapshot>;
    fn list_tags(&self) -> RepoResult<Vec<Tag>>;

    /// One batched load per child table.
    fn load_children(&self, ids: &[RecipeId]) -> RepoResult<RecipeChildren> {
        Ok(RecipeChildren {
            steps: self.steps_for_recipes(ids)?,
            ingredients: self.ingredient_links_for_recipes(ids)?,
            tags: self.tag_links_for_recipes(ids)?,
        })
    }
}

/// SQLite-backed recipe repository.
pub struct SqliteRecipeRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteRecipeRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl RecipeRepository for SqliteRecipeRepository<'_> {
    fn create_recipe(&mut self, draft: &RecipeDraft) -> RepoResult<RecipeId> {
        draft.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let fields = &draft.fields;
        tx.execute(
            "INSERT INTO recipes (
                title,
                description,
                cooking_time,
                servings,
                difficulty,
                image_url,
                writer_id,
                ingredients_count,
                kind,
                situation,
                main_ingredient,
                cooking_method
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                fields.title.trim(),
                fields.description.as_deref(),
                fields.cooking_time,
                fields.servings,
                fields.difficulty.as_deref(),
                fields.image_url.as_deref(),
                fields.writer_id.as_str(),
                fields.ingredients_count,
                fields.kind.as_deref(),
                fields.situation.as_deref(),
                fields.main_ingredient.as_deref(),
                fields.cooking_method.as_deref(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        replace_steps(&tx, id, &draft.steps)?;
        replace_ingredient_links(&tx, id, &draft.ingredients)?;
        replace_tag_links(&tx, id, &draft.tags)?;
        tx.commit()?;

        info!(
            "event=recipe_create module=repo status=ok recipe_id={} steps={} ingredients={} tags={}",
            id,
            draft.steps.len(),
            draft.ingredients.len(),
            draft.tags.len()
        );
        Ok(id)
    }

    fn update_recipe(&mut self, id: RecipeId, update: &RecipeUpdate) -> RepoResult<()> {
        update.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let fields = &update.fields;
        let changed = tx.execute(
            "UPDATE recipes
             SET
                title = ?2,
                description = ?3,
                cooking_time = ?4,
                servings = ?5,
                difficulty = ?6,
                image_url = ?7,
                writer_id = ?8,
                ingredients_count = ?9,
                kind = ?10,
                situation = ?11,
                main_ingredient = ?12,
                cooking_method = ?13,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                fields.title.trim(),
                fields.description.as_deref(),
                fields.cooking_time,
                fields.servings,
                fields.difficulty.as_deref(),
                fields.image_url.as_deref(),
                fields.writer_id.as_str(),
                fields.ingredients_count,
                fields.kind.as_deref(),
                fields.situation.as_deref(),
                fields.main_ingredient.as_deref(),
                fields.cooking_method.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("recipe", id));
        }

        if let Some(steps) = &update.steps {
            replace_steps(&tx, id, steps)?;
        }
        if let Some(ingredients) = &update.ingredients {
            replace_ingredient_links(&tx, id, ingredients)?;
        }
        if let Some(tags) = &update.tags {
            replace_tag_links(&tx, id, tags)?;
        }
        if update.clear_legacy_columns {
            tx.execute(
                "UPDATE recipes
                 SET instructions_raw = NULL, ingredients_raw = NULL, hashtags_raw = NULL
                 WHERE id = ?1;",
                [id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_recipe(&mut self, id: RecipeId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM recipes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("recipe", id));
        }
        tx.commit()?;
        info!("event=recipe_delete module=repo status=ok recipe_id={}", id);
        Ok(())
    }

    fn import_legacy_recipe(
        &mut self,
        fields: &RecipeFields,
        raw: &LegacyRawColumns,
    ) -> RepoResult<RecipeId> {
        fields.validate()?;
        self.conn.execute(
            "INSERT INTO recipes (
                title,
                description,
                cooking_time,
                servings,
                difficulty,
                image_url,
                writer_id,
                ingredients_count,
                kind,
                situation,
                main_ingredient,
                cooking_method,
                instructions_raw,
                ingredients_raw,
                hashtags_raw
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
            params![
                fields.title.trim(),
                fields.description.as_deref(),
                fields.cooking_time,
                fields.servings,
                fields.difficulty.as_deref(),
                fields.image_url.as_deref(),
                fields.writer_id.as_str(),
                fields.ingredients_count,
                fields.kind.as_deref(),
                fields.situation.as_deref(),
                fields.main_ingredient.as_deref(),
                fields.cooking_method.as_deref(),
                raw.instructions_raw.as_deref(),
                raw.ingredients_raw.as_deref(),
                raw.hashtags_raw.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_recipe(&self, id: RecipeId) -> RepoResult<Option<Recipe>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RECIPE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_recipe_row(row)?)),
            None => Ok(None),
        }
    }

    fn recipe_exists(&self, id: RecipeId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM recipes WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_recipes(&self, query: &RecipeListQuery) -> RepoResult<Vec<Recipe>> {
        let mut sql = format!("{RECIPE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match &query.filter {
            RecipeFilter::All => {}
            RecipeFilter::Writer(writer_id) => {
                sql.push_str(" AND writer_id = ?");
                bind_values.push(Value::Text(writer_id.clone()));
            }
            RecipeFilter::Difficulty(difficulty) => {
                sql.push_str(" AND difficulty = ? COLLATE NOCASE");
                bind_values.push(Value::Text(difficulty.trim().to_string()));
            }
            RecipeFilter::MaxCookingTime(minutes) => {
                sql.push_str(" AND cooking_time IS NOT NULL AND cooking_time <= ?");
                bind_values.push(Value::Integer(i64::from(*minutes)));
            }
            RecipeFilter::Keyword(keyword) => {
                let pattern = like_contains_pattern(keyword);
                sql.push_str(
                    " AND (title LIKE ? ESCAPE '\\' OR IFNULL(description, '') LIKE ? ESCAPE '\\')",
                );
                bind_values.push(Value::Text(pattern.clone()));
                bind_values.push(Value::Text(pattern));
            }
        }

        sql.push_str(match query.order {
            RecipeOrder::Newest => " ORDER BY created_at DESC, id DESC",
            RecipeOrder::MostViewed => " ORDER BY view_count DESC, created_at DESC, id DESC",
        });
        push_page(&mut sql, &mut bind_values, query.page);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut recipes = Vec::new();
        while let Some(row) = rows.next()? {
            recipes.push(parse_recipe_row(row)?);
        }
        Ok(recipes)
    }

    fn count_recipes_by_writer(&self, writer_id: &str) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE writer_id = ?1;",
            [writer_id],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative recipe count {count}")))
    }

    fn steps_for_recipes(&self, ids: &[RecipeId]) -> RepoResult<Vec<RecipeStep>> {
        let mut steps = Vec::new();
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let sql = format!(
                "SELECT recipe_id, step_index, description, image_url
                 FROM recipe_step
                 WHERE recipe_id IN ({})
                 ORDER BY recipe_id ASC, step_index ASC;",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(id_params(chunk))?;
            while let Some(row) = rows.next()? {
                steps.push(RecipeStep {
                    recipe_id: row.get("recipe_id")?,
                    step_index: row.get("step_index")?,
                    description: row.get("description")?,
                    image_url: row.get("image_url")?,
                });
            }
        }
        Ok(steps)
    }

    fn ingredient_links_for_recipes(
        &self,
        ids: &[RecipeId],
    ) -> RepoResult<Vec<RecipeIngredientLink>> {
        let mut links = Vec::new();
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let sql = format!(
                "SELECT recipe_id, ingredient_id, amount
                 FROM recipe_ingredient
                 WHERE recipe_id IN ({})
                 ORDER BY recipe_id ASC, id ASC;",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(id_params(chunk))?;
            while let Some(row) = rows.next()? {
                links.push(RecipeIngredientLink {
                    recipe_id: row.get("recipe_id")?,
                    ingredient_id: row.get("ingredient_id")?,
                    amount: row.get("amount")?,
                });
            }
        }
        Ok(links)
    }

    fn tag_links_for_recipes(&self, ids: &[RecipeId]) -> RepoResult<Vec<RecipeTagLink>> {
        let mut links = Vec::new();
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let sql = format!(
                "SELECT recipe_id, tag_id
                 FROM recipe_tag
                 WHERE recipe_id IN ({})
                 ORDER BY recipe_id ASC, id ASC;",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(id_params(chunk))?;
            while let Some(row) = rows.next()? {
                links.push(RecipeTagLink {
                    recipe_id: row.get("recipe_id")?,
                    tag_id: row.get("tag_id")?,
                });
            }
        }
        Ok(links)
    }

    fn load_dictionary(
        &self,
        ingredient_ids: &[IngredientId],
        tag_ids: &[TagId],
    ) -> RepoResult<DictionarySnapshot> {
        dictionary::load_snapshot(self.conn, ingredient_ids, tag_ids)
    }

    fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        dictionary::list_tags(self.conn)
    }
}

fn id_params(ids: &[i64]) -> rusqlite::ParamsFromIter<impl Iterator<Item = Value> + '_> {
    params_from_iter(ids.iter().copied().map(Value::Integer))
}

fn replace_steps(conn: &Connection, recipe_id: RecipeId, steps: &[StepDraft]) -> RepoResult<()> {
    conn.execute("DELETE FROM recipe_step WHERE recipe_id = ?1;", [recipe_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO recipe_step (recipe_id, step_index, description, image_url)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for (step, step_index) in steps.iter().zip(1u32..) {
        stmt.execute(params![
            recipe_id,
            step_index,
            step.description.trim(),
            step.image_url.as_deref(),
        ])?;
    }
    Ok(())
}

fn replace_ingredient_links(
    conn: &Connection,
    recipe_id: RecipeId,
    ingredients: &[IngredientDraft],
) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM recipe_ingredient WHERE recipe_id = ?1;",
        [recipe_id],
    )?;
    let mut seen = HashSet::new();
    let mut stmt = conn.prepare(
        "INSERT INTO recipe_ingredient (recipe_id, ingredient_id, amount)
         VALUES (?1, ?2, ?3);",
    )?;
    for ingredient in ingredients {
        let ingredient_id = dictionary::find_or_create(
            conn,
            DictionaryKind::Ingredient,
            &ingredient.ingredient_name,
        )?;
        if seen.insert(ingredient_id) {
            stmt.execute(params![
                recipe_id,
                ingredient_id,
                ingredient.amount.as_deref()
            ])?;
        }
    }
    Ok(())
}

fn replace_tag_links(conn: &Connection, recipe_id: RecipeId, tags: &[String]) -> RepoResult<()> {
    conn.execute("DELETE FROM recipe_tag WHERE recipe_id = ?1;", [recipe_id])?;
    let mut stmt = conn.prepare("INSERT INTO recipe_tag (recipe_id, tag_id) VALUES (?1, ?2);")?;
    let mut seen = HashSet::new();
    for name in normalize_tag_names(tags) {
        let tag_id = dictionary::find_or_create(conn, DictionaryKind::Tag, &name)?;
        if seen.insert(tag_id) {
            stmt.execute(params![recipe_id, tag_id])?;
        }
    }
    Ok(())
}

fn parse_recipe_row(row: &Row<'_>) -> RepoResult<Recipe> {
    let id: RecipeId = row.get("id")?;
    let raw = LegacyRawColumns {
        instructions_raw: row.get("instructions_raw")?,
        ingredients_raw: row.get("ingredients_raw")?,
        hashtags_raw: row.get("hashtags_raw")?,
    };
    let legacy = if raw == LegacyRawColumns::default() {
        LegacyColumns::default()
    } else {
        parse_legacy_columns(&raw)
    };

    let view_count: i64 = row.get("view_count")?;
    if view_count < 0 {
        return Err(RepoError::InvalidData(format!(
            "recipe {id} has negative view_count {view_count}"
        )));
    }

    Ok(Recipe {
        id,
        fields: RecipeFields {
            title: row.get("title")?,
            description: row.get("description")?,
            cooking_time: row.get("cooking_time")?,
            servings: row.get("servings")?,
            difficulty: row.get("difficulty")?,
            image_url: row.get("image_url")?,
            writer_id: row.get("writer_id")?,
            ingredients_count: row.get("ingredients_count")?,
            kind: row.get("kind")?,
            situation: row.get("situation")?,
            main_ingredient: row.get("main_ingredient")?,
            cooking_method: row.get("cooking_method")?,
        },
        view_count,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        legacy,
    })
}

#[cfg(test)]
mod tests {
    use super::{RecipeFilter, RecipeListQuery, RecipeOrder};
    use crate::repo::Page;

    #[test]
    fn keyword_queries_have_no_cache_qualifier() {
        let query = RecipeListQuery::new(
            RecipeFilter::Keyword("soup".to_string()),
            RecipeOrder::Newest,
            None,
        );
        assert_eq!(query.cache_qualifier(), None);
    }

    #[test]
    fn qualifier_encodes_filter_order_and_page() {
        let query = RecipeListQuery::new(
            RecipeFilter::Writer("w-1".to_string()),
            RecipeOrder::MostViewed,
            Some(Page::new(5, 10)),
        );
        assert_eq!(
            query.cache_qualifier().as_deref(),
            Some("writer:w-1:top:l5:o10")
        );
    }
}
