//! Source-of-truth repositories over SQLite.
//!
//! # Responsibility
//! - Define per-entity data access contracts used by services.
//! - Keep SQL, row decoding and transaction scope inside this layer.
//!
//! # Invariants
//! - Write paths validate input before any SQL mutation.
//! - Multi-row writes (recipe root plus children) commit in one transaction.
//! - Missing rows surface as `RepoError::NotFound`, unique collisions as
//!   `RepoError::Conflict`.

pub mod board_repo;
pub mod dictionary;
pub mod error;
pub mod ingredient_repo;
pub mod recipe_repo;
pub mod user_repo;

pub use error::{RepoError, RepoResult};

use crate::db::migrations::{current_user_version, latest_version};
use rusqlite::types::Value;
use rusqlite::Connection;

const DEFAULT_LIST_LIMIT: u32 = 10;
const LIST_LIMIT_MAX: u32 = 50;

/// Offset/limit window for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Defaults to 10 and clamps to 50.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    pub fn first(limit: u32) -> Self {
        Self::new(limit, 0)
    }

    pub fn applied_limit(&self) -> u32 {
        normalize_list_limit(self.limit)
    }

    /// Stable cache qualifier for this window, e.g. `l10:o0`.
    pub fn qualifier(&self) -> String {
        format!("l{}:o{}", self.applied_limit(), self.offset)
    }
}

/// Normalizes a list limit: `None`/`0` become 10, values above 50 clamp.
pub fn normalize_list_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => DEFAULT_LIST_LIMIT,
        Some(value) if value > LIST_LIMIT_MAX => LIST_LIMIT_MAX,
        Some(value) => value,
    }
}

/// Cache qualifier segment for an optional page; `all` when unpaginated.
pub(crate) fn page_qualifier(page: Option<Page>) -> String {
    page.map_or_else(|| "all".to_string(), |page| page.qualifier())
}

/// Appends `LIMIT ? OFFSET ?` when a page is given, and terminates the
/// statement.
pub(crate) fn push_page(sql: &mut String, bind_values: &mut Vec<Value>, page: Option<Page>) {
    if let Some(page) = page {
        sql.push_str(" LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(page.applied_limit())));
        bind_values.push(Value::Integer(i64::from(page.offset)));
    }
    sql.push(';');
}

/// Rejects connections that were not migrated by `db::open_db*`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn parse_flag(column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value {other} in {column}"
        ))),
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::{like_contains_pattern, normalize_list_limit, Page};

    #[test]
    fn list_limit_defaults_and_clamps() {
        assert_eq!(normalize_list_limit(None), 10);
        assert_eq!(normalize_list_limit(Some(0)), 10);
        assert_eq!(normalize_list_limit(Some(25)), 25);
        assert_eq!(normalize_list_limit(Some(500)), 50);
        assert_eq!(Page::new(500, 20).qualifier(), "l50:o20");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_contains_pattern(" 50%_off "), "%50\\%\\_off%");
    }
}
