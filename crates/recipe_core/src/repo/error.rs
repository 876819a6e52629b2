//! Repository error taxonomy shared by every SQLite repository.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    /// Store transport failure ("store unavailable").
    Db(DbError),
    NotFound {
        entity: &'static str,
        key: String,
    },
    /// Unique field already taken by another row.
    Conflict {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    /// Connection was not migrated to the schema this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted row violates a model invariant.
    InvalidData(String),
}

impl RepoError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn conflict(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            field,
            value: value.into(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict {
                entity,
                field,
                value,
            } => write!(f, "{entity} with {field} `{value}` already exists"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "repository requires table `{table}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
