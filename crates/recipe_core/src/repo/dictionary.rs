//! Name-keyed dictionary lookups shared by the recipe and ingredient
//! repositories.
//!
//! # Invariants
//! - `find_or_create` never produces two rows with the same name; a lost
//!   insert race resolves to the winner's id.
//! - Snapshot loads are batched by id list, one query per chunk.

use crate::assemble::recipe_assembler::DictionarySnapshot;
use crate::model::dictionary::{IngredientId, Tag, TagId};
use crate::repo::{RepoError, RepoResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;

const FIND_OR_CREATE_ATTEMPTS: usize = 3;
/// Stays below SQLite's default bound-parameter limit.
pub(crate) const ID_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryKind {
    Ingredient,
    Tag,
}

impl DictionaryKind {
    fn table(self) -> &'static str {
        match self {
            Self::Ingredient => "ingredients",
            Self::Tag => "tags",
        }
    }

    fn entity(self) -> &'static str {
        match self {
            Self::Ingredient => "ingredient",
            Self::Tag => "tag",
        }
    }
}

/// Returns the id of the entry named `name`, inserting it when absent.
///
/// Insert uses `ON CONFLICT DO NOTHING` and re-selects, so a concurrent
/// creator of the same name yields that creator's id instead of an error.
pub fn find_or_create(conn: &Connection, kind: DictionaryKind, name: &str) -> RepoResult<i64> {
    let name = name.trim();
    let table = kind.table();
    for _ in 0..FIND_OR_CREATE_ATTEMPTS {
        if let Some(id) = find_id_by_name(conn, kind, name)? {
            return Ok(id);
        }

        let inserted = conn.execute(
            &format!("INSERT INTO {table} (name) VALUES (?1) ON CONFLICT(name) DO NOTHING;"),
            [name],
        )?;
        if inserted == 1 {
            debug!(
                "event=dictionary_insert module=repo status=ok entity={}",
                kind.entity()
            );
            return Ok(conn.last_insert_rowid());
        }
    }

    Err(RepoError::InvalidData(format!(
        "{} `{name}` could not be resolved after {FIND_OR_CREATE_ATTEMPTS} attempts",
        kind.entity()
    )))
}

pub fn find_id_by_name(
    conn: &Connection,
    kind: DictionaryKind,
    name: &str,
) -> RepoResult<Option<i64>> {
    let id = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE name = ?1;", kind.table()),
            [name.trim()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Loads names for the given ids; ids with no row are simply absent.
pub fn load_names(
    conn: &Connection,
    kind: DictionaryKind,
    ids: &[i64],
) -> RepoResult<HashMap<i64, String>> {
    let mut names = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(ID_CHUNK_SIZE) {
        let sql = format!(
            "SELECT id, name FROM {} WHERE id IN ({});",
            kind.table(),
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(chunk.iter().copied().map(Value::Integer)))?;
        while let Some(row) = rows.next()? {
            names.insert(row.get("id")?, row.get("name")?);
        }
    }
    Ok(names)
}

pub fn load_snapshot(
    conn: &Connection,
    ingredient_ids: &[IngredientId],
    tag_ids: &[TagId],
) -> RepoResult<DictionarySnapshot> {
    Ok(DictionarySnapshot {
        ingredients: load_names(conn, DictionaryKind::Ingredient, ingredient_ids)?,
        tags: load_names(conn, DictionaryKind::Tag, tag_ids)?,
    })
}

pub fn list_tags(conn: &Connection) -> RepoResult<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name ASC, id ASC;")?;
    let mut rows = stmt.query([])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(Tag {
            id: row.get("id")?,
            name: row.get("name")?,
        });
    }
    Ok(tags)
}

/// `?, ?, ?` with `count` placeholders.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::{find_or_create, load_snapshot, placeholders, DictionaryKind};
    use crate::db::open_db_in_memory;

    #[test]
    fn find_or_create_reuses_existing_name() {
        let conn = open_db_in_memory().unwrap();
        let first = find_or_create(&conn, DictionaryKind::Ingredient, "onion").unwrap();
        let second = find_or_create(&conn, DictionaryKind::Ingredient, " onion ").unwrap();
        assert_eq!(first, second);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ingredients;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn snapshot_omits_unknown_ids() {
        let conn = open_db_in_memory().unwrap();
        let tag_id = find_or_create(&conn, DictionaryKind::Tag, "quick").unwrap();

        let snapshot = load_snapshot(&conn, &[404], &[tag_id, 405]).unwrap();
        assert!(snapshot.ingredients.is_empty());
        assert_eq!(snapshot.tag_name(tag_id), Some("quick"));
        assert_eq!(snapshot.tag_name(405), None);
    }

    #[test]
    fn placeholders_match_count() {
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
