//! User profile repository.
//!
//! # Invariants
//! - `username` and `email` are each unique; collisions map to
//!   `RepoError::Conflict` naming the offending field.

use crate::db::{constraint_message, is_unique_violation};
use crate::model::user::{User, UserId, UserInput};
use crate::repo::{
    bool_to_int, ensure_connection_ready, page_qualifier, parse_flag, push_page, Page, RepoError,
    RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    is_corporate,
    created_at,
    updated_at
FROM users";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListQuery {
    pub corporate_only: bool,
    /// `None` returns every matching row.
    pub page: Option<Page>,
}

impl UserListQuery {
    pub fn cache_qualifier(&self) -> String {
        let scope = if self.corporate_only {
            "corporate"
        } else {
            "all"
        };
        format!("{scope}:{}", page_qualifier(self.page))
    }
}

pub trait UserRepository {
    fn create_user(&self, input: &UserInput) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>>;
    fn update_user(&self, id: UserId, input: &UserInput) -> RepoResult<()>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
    fn exists_by_username(&self, username: &str) -> RepoResult<bool>;
    fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users"])?;
        Ok(Self { conn })
    }

    fn find_one(&self, predicate: &str, value: Value) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE {predicate};"))?;
        let mut rows = stmt.query([value])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, input: &UserInput) -> RepoResult<UserId> {
        input.validate()?;
        let username = input.username.trim();
        let email = input.email.trim();
        self.conn
            .execute(
                "INSERT INTO users (username, email, is_corporate) VALUES (?1, ?2, ?3);",
                params![username, email, bool_to_int(input.is_corporate)],
            )
            .map_err(|err| map_unique_violation(err, username, email))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.find_one("id = ?1", Value::Integer(id))
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.find_one("username = ?1", Value::Text(username.trim().to_string()))
    }

    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        if query.corporate_only {
            sql.push_str(" AND is_corporate = 1");
        }
        sql.push_str(" ORDER BY id ASC");
        let mut bind_values = Vec::new();
        push_page(&mut sql, &mut bind_values, query.page);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn update_user(&self, id: UserId, input: &UserInput) -> RepoResult<()> {
        input.validate()?;
        let username = input.username.trim();
        let email = input.email.trim();
        let changed = self
            .conn
            .execute(
                "UPDATE users
                 SET
                    username = ?2,
                    email = ?3,
                    is_corporate = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![id, username, email, bool_to_int(input.is_corporate)],
            )
            .map_err(|err| map_unique_violation(err, username, email))?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn exists_by_username(&self, username: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1);",
            [username.trim()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1);",
            [email.trim()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn map_unique_violation(err: rusqlite::Error, username: &str, email: &str) -> RepoError {
    if !is_unique_violation(&err) {
        return err.into();
    }
    if constraint_message(&err).is_some_and(|message| message.contains("users.email")) {
        RepoError::conflict("user", "email", email)
    } else {
        RepoError::conflict("user", "username", username)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let is_corporate: i64 = row.get("is_corporate")?;
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        is_corporate: parse_flag("users.is_corporate", is_corporate)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
