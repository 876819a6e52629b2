//! Community board post repository.

use crate::model::board_post::{BoardPost, BoardPostId, BoardPostInput};
use crate::repo::{
    bool_to_int, ensure_connection_ready, like_contains_pattern, page_qualifier, parse_flag,
    push_page, Page, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const POST_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    author_id,
    author_name,
    original_language,
    view_count,
    is_pinned,
    created_at,
    updated_at
FROM board_posts";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BoardPostFilter {
    /// Pinned posts first, then newest.
    #[default]
    All,
    PinnedOnly,
    Author(i64),
    /// Case-insensitive substring of title or content.
    Keyword(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardPostListQuery {
    pub filter: BoardPostFilter,
    /// `None` returns every matching row.
    pub page: Option<Page>,
}

impl BoardPostListQuery {
    pub fn new(filter: BoardPostFilter, page: Option<Page>) -> Self {
        Self { filter, page }
    }

    pub fn cache_qualifier(&self) -> Option<String> {
        let filter = match &self.filter {
            BoardPostFilter::All => "all".to_string(),
            BoardPostFilter::PinnedOnly => "pinned".to_string(),
            BoardPostFilter::Author(author_id) => format!("author:{author_id}"),
            BoardPostFilter::Keyword(_) => return None,
        };
        Some(format!("{filter}:{}", page_qualifier(self.page)))
    }
}

pub trait BoardPostRepository {
    fn create_post(&self, input: &BoardPostInput) -> RepoResult<BoardPostId>;
    fn get_post(&self, id: BoardPostId) -> RepoResult<Option<BoardPost>>;
    fn list_posts(&self, query: &BoardPostListQuery) -> RepoResult<Vec<BoardPost>>;
    fn update_post(&self, id: BoardPostId, input: &BoardPostInput) -> RepoResult<()>;
    fn delete_post(&self, id: BoardPostId) -> RepoResult<()>;
    /// Adds one to the stored view counter.
    fn increment_view_count(&self, id: BoardPostId) -> RepoResult<()>;
    fn count_posts_by_author(&self, author_id: i64) -> RepoResult<u64>;
}

pub struct SqliteBoardPostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardPostRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["board_posts"])?;
        Ok(Self { conn })
    }
}

impl BoardPostRepository for SqliteBoardPostRepository<'_> {
    fn create_post(&self, input: &BoardPostInput) -> RepoResult<BoardPostId> {
        input.validate()?;
        self.conn.execute(
            "INSERT INTO board_posts (
                title,
                content,
                author_id,
                author_name,
                original_language,
                is_pinned
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                input.title.trim(),
                input.content.as_str(),
                input.author_id,
                input.author_name.as_deref(),
                input.language(),
                bool_to_int(input.is_pinned),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_post(&self, id: BoardPostId) -> RepoResult<Option<BoardPost>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_post_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_posts(&self, query: &BoardPostListQuery) -> RepoResult<Vec<BoardPost>> {
        let mut sql = format!("{POST_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match &query.filter {
            BoardPostFilter::All => {}
            BoardPostFilter::PinnedOnly => sql.push_str(" AND is_pinned = 1"),
            BoardPostFilter::Author(author_id) => {
                sql.push_str(" AND author_id = ?");
                bind_values.push(Value::Integer(*author_id));
            }
            BoardPostFilter::Keyword(keyword) => {
                let pattern = like_contains_pattern(keyword);
                sql.push_str(" AND (title LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\')");
                bind_values.push(Value::Text(pattern.clone()));
                bind_values.push(Value::Text(pattern));
            }
        }

        sql.push_str(" ORDER BY is_pinned DESC, created_at DESC, id DESC");
        push_page(&mut sql, &mut bind_values, query.page);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(row)?);
        }
        Ok(posts)
    }

    fn update_post(&self, id: BoardPostId, input: &BoardPostInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self.conn.execute(
            "UPDATE board_posts
             SET
                title = ?2,
                content = ?3,
                author_name = ?4,
                original_language = ?5,
                is_pinned = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                input.title.trim(),
                input.content.as_str(),
                input.author_name.as_deref(),
                input.language(),
                bool_to_int(input.is_pinned),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("board_post", id));
        }
        Ok(())
    }

    fn delete_post(&self, id: BoardPostId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM board_posts WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("board_post", id));
        }
        Ok(())
    }

    fn increment_view_count(&self, id: BoardPostId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE board_posts SET view_count = view_count + 1 WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("board_post", id));
        }
        Ok(())
    }

    fn count_posts_by_author(&self, author_id: i64) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM board_posts WHERE author_id = ?1;",
            [author_id],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative post count {count}")))
    }
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<BoardPost> {
    let is_pinned: i64 = row.get("is_pinned")?;
    Ok(BoardPost {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        author_id: row.get("author_id")?,
        author_name: row.get("author_name")?,
        original_language: row.get("original_language")?,
        view_count: row.get("view_count")?,
        is_pinned: parse_flag("board_posts.is_pinned", is_pinned)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
