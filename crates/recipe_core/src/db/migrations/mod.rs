//! Schema steps for the recipe store.
//!
//! # Invariants
//! - Steps are listed in strictly increasing `version` order.
//! - `PRAGMA user_version` holds the last step applied; pending steps run in
//!   one transaction, so a failed step leaves the schema where it was.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "board_posts",
        sql: include_str!("0002_board_posts.sql"),
    },
    SchemaStep {
        version: 3,
        name: "legacy_recipe_columns",
        sql: include_str!("0003_legacy_recipe_columns.sql"),
    },
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the file was written by a newer
///   build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let applied = current_user_version(conn)?;
    let latest = latest_version();
    if applied > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: applied,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > applied)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    let names: Vec<&str> = pending.iter().map(|step| step.name).collect();
    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        applied,
        latest,
        names.join(",")
    );
    Ok(())
}

/// Reads `PRAGMA user_version` of `conn`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, current_user_version, latest_version, SCHEMA_STEPS};
    use rusqlite::Connection;

    #[test]
    fn steps_are_strictly_increasing() {
        assert!(SCHEMA_STEPS
            .windows(2)
            .all(|pair| pair[0].version < pair[1].version));
        assert_eq!(latest_version(), 3);
    }

    #[test]
    fn partial_schema_resumes_from_applied_step() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_STEPS[0].sql).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        apply_migrations(&mut conn).unwrap();

        assert_eq!(current_user_version(&conn).unwrap(), latest_version());
        let board_posts: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'board_posts';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(board_posts, 1);
    }
}
