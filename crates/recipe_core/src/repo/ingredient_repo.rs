//! Ingredient catalog repository.
//!
//! # Invariants
//! - Ingredient names are unique and stored trimmed; a collision surfaces as
//!   `RepoError::Conflict` on the `name` field.
//! - Deleting an ingredient leaves recipe links in place; they read back
//!   with no resolved name.

use crate::db::is_unique_violation;
use crate::model::dictionary::{Ingredient, IngredientId, IngredientInput};
use crate::repo::{
    bool_to_int, ensure_connection_ready, like_contains_pattern, page_qualifier, parse_flag,
    push_page, Page, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const INGREDIENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    unit,
    category,
    price_cents,
    in_stock,
    stock_quantity,
    image_url,
    supplier,
    created_at,
    updated_at
FROM ingredients";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IngredientFilter {
    #[default]
    All,
    Category(String),
    InStock,
    /// Inclusive price bounds in minor units.
    PriceRange { min_cents: i64, max_cents: i64 },
    /// Case-insensitive substring of the name.
    Keyword(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientListQuery {
    pub filter: IngredientFilter,
    /// `None` returns every matching row.
    pub page: Option<Page>,
}

impl IngredientListQuery {
    pub fn new(filter: IngredientFilter, page: Option<Page>) -> Self {
        Self { filter, page }
    }

    /// Qualifier for `ingredient:list:<qualifier>` keys; `None` for keyword
    /// searches, which are not cached.
    pub fn cache_qualifier(&self) -> Option<String> {
        let filter = match &self.filter {
            IngredientFilter::All => "all".to_string(),
            IngredientFilter::Category(category) => format!("category:{category}"),
            IngredientFilter::InStock => "in_stock".to_string(),
            IngredientFilter::PriceRange {
                min_cents,
                max_cents,
            } => format!("price:{min_cents}-{max_cents}"),
            IngredientFilter::Keyword(_) => return None,
        };
        Some(format!("{filter}:{}", page_qualifier(self.page)))
    }
}

pub trait IngredientRepository {
    fn create_ingredient(&self, input: &IngredientInput) -> RepoResult<IngredientId>;
    fn get_ingredient(&self, id: IngredientId) -> RepoResult<Option<Ingredient>>;
    fn list_ingredients(&self, query: &IngredientListQuery) -> RepoResult<Vec<Ingredient>>;
    fn update_ingredient(&self, id: IngredientId, input: &IngredientInput) -> RepoResult<()>;
    fn delete_ingredient(&self, id: IngredientId) -> RepoResult<()>;
    fn count_in_stock(&self) -> RepoResult<u64>;
}

pub struct SqliteIngredientRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIngredientRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["ingredients"])?;
        Ok(Self { conn })
    }
}

impl IngredientRepository for SqliteIngredientRepository<'_> {
    fn create_ingredient(&self, input: &IngredientInput) -> RepoResult<IngredientId> {
        input.validate()?;
        let name = input.name.trim();
        let inserted = self.conn.execute(
            "INSERT INTO ingredients (
                name,
                description,
                unit,
                category,
                price_cents,
                in_stock,
                stock_quantity,
                image_url,
                supplier
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                name,
                input.description.as_deref(),
                input.unit.as_deref(),
                input.category.as_deref(),
                input.price_cents,
                bool_to_int(input.in_stock),
                input.stock_quantity,
                input.image_url.as_deref(),
                input.supplier.as_deref(),
            ],
        );
        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::conflict("ingredient", "name", name))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_ingredient(&self, id: IngredientId) -> RepoResult<Option<Ingredient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INGREDIENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_ingredient_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_ingredients(&self, query: &IngredientListQuery) -> RepoResult<Vec<Ingredient>> {
        let mut sql = format!("{INGREDIENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match &query.filter {
            IngredientFilter::All => {}
            IngredientFilter::Category(category) => {
                sql.push_str(" AND category = ? COLLATE NOCASE");
                bind_values.push(Value::Text(category.trim().to_string()));
            }
            IngredientFilter::InStock => sql.push_str(" AND in_stock = 1"),
            IngredientFilter::PriceRange {
                min_cents,
                max_cents,
            } => {
                sql.push_str(" AND price_cents BETWEEN ? AND ?");
                bind_values.push(Value::Integer(*min_cents));
                bind_values.push(Value::Integer(*max_cents));
            }
            IngredientFilter::Keyword(keyword) => {
                sql.push_str(" AND name LIKE ? ESCAPE '\\'");
                bind_values.push(Value::Text(like_contains_pattern(keyword)));
            }
        }

        sql.push_str(" ORDER BY name ASC, id ASC");
        push_page(&mut sql, &mut bind_values, query.page);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut ingredients = Vec::new();
        while let Some(row) = rows.next()? {
            ingredients.push(parse_ingredient_row(row)?);
        }
        Ok(ingredients)
    }

    fn update_ingredient(&self, id: IngredientId, input: &IngredientInput) -> RepoResult<()> {
        input.validate()?;
        let name = input.name.trim();
        let updated = self.conn.execute(
            "UPDATE ingredients
             SET
                name = ?2,
                description = ?3,
                unit = ?4,
                category = ?5,
                price_cents = ?6,
                in_stock = ?7,
                stock_quantity = ?8,
                image_url = ?9,
                supplier = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                name,
                input.description.as_deref(),
                input.unit.as_deref(),
                input.category.as_deref(),
                input.price_cents,
                bool_to_int(input.in_stock),
                input.stock_quantity,
                input.image_url.as_deref(),
                input.supplier.as_deref(),
            ],
        );
        match updated {
            Ok(0) => Err(RepoError::not_found("ingredient", id)),
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::conflict("ingredient", "name", name))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete_ingredient(&self, id: IngredientId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM ingredients WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("ingredient", id));
        }
        Ok(())
    }

    fn count_in_stock(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ingredients WHERE in_stock = 1;",
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative ingredient count {count}")))
    }
}

fn parse_ingredient_row(row: &Row<'_>) -> RepoResult<Ingredient> {
    let in_stock: i64 = row.get("in_stock")?;
    Ok(Ingredient {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        unit: row.get("unit")?,
        category: row.get("category")?,
        price_cents: row.get("price_cents")?,
        in_stock: parse_flag("ingredients.in_stock", in_stock)?,
        stock_quantity: row.get("stock_quantity")?,
        image_url: row.get("image_url")?,
        supplier: row.get("supplier")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{IngredientFilter, IngredientListQuery};
    use crate::repo::Page;

    #[test]
    fn qualifier_distinguishes_filters() {
        let in_stock = IngredientListQuery::new(IngredientFilter::InStock, Some(Page::first(20)));
        let category = IngredientListQuery::new(
            IngredientFilter::Category("veg".to_string()),
            None,
        );
        assert_eq!(in_stock.cache_qualifier().as_deref(), Some("in_stock:l20:o0"));
        assert_eq!(
            category.cache_qualifier().as_deref(),
            Some("category:veg:all")
        );
    }
}
