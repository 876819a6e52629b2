//! Error surface shared by every entity service.

use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for recipe platform use-cases.
///
/// Cache failures never appear here; they degrade to store reads.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before persistence.
    Validation(ValidationError),
    /// Target entity does not exist.
    NotFound { entity: &'static str, key: String },
    /// Unique field already taken.
    Conflict {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// `true` when the relational store itself failed.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Repo(RepoError::Db(_)))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid input: {err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict {
                entity,
                field,
                value,
            } => write!(f, "{entity} with {field} `{value}` already exists"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            RepoError::Conflict {
                entity,
                field,
                value,
            } => Self::Conflict {
                entity,
                field,
                value,
            },
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::db::DbError;
    use crate::repo::RepoError;

    #[test]
    fn repo_not_found_maps_to_service_not_found() {
        let err = ServiceError::from(RepoError::not_found("recipe", 9));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "recipe not found: 9");
    }

    #[test]
    fn db_failure_reports_store_unavailable() {
        let err = ServiceError::from(RepoError::Db(DbError::Sqlite(
            rusqlite::Error::InvalidQuery,
        )));
        assert!(err.is_store_unavailable());
    }
}
