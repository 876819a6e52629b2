//! Community board post record.

use crate::model::validation::{limit_len, require_text, ValidationError};
use serde::{Deserialize, Serialize};

pub type BoardPostId = i64;

pub const POST_TITLE_MAX_CHARS: usize = 255;
pub const DEFAULT_LANGUAGE: &str = "ko";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPost {
    pub id: BoardPostId,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_name: Option<String>,
    /// ISO 639-1 code of the text as written.
    pub original_language: String,
    pub view_count: i64,
    pub is_pinned: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Write input for board post create/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardPostInput {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_name: Option<String>,
    pub original_language: Option<String>,
    pub is_pinned: bool,
}

impl BoardPostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>, author_id: i64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            author_id,
            author_name: None,
            original_language: None,
            is_pinned: false,
        }
    }

    /// Language stored for this post, defaulting to Korean.
    pub fn language(&self) -> &str {
        self.original_language
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        limit_len("title", Some(self.title.as_str()), POST_TITLE_MAX_CHARS)?;
        require_text("content", &self.content)?;
        Ok(())
    }
}
