//! Input validation errors shared by all write models.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Write input rejected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trimming.
    EmptyField(&'static str),
    /// Text field exceeds its maximum length in characters.
    TooLong { field: &'static str, max: usize },
    /// Numeric field must be strictly positive when present.
    NotPositive(&'static str),
    /// Numeric field must not be negative.
    Negative(&'static str),
    /// Lower bound exceeds upper bound.
    InvalidRange(&'static str),
    /// Email does not have a `local@domain` shape.
    InvalidEmail(String),
    /// One element of a child collection is invalid.
    InvalidChild {
        collection: &'static str,
        position: usize,
        reason: Box<ValidationError>,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
            Self::TooLong { field, max } => {
                write!(f, "`{field}` must not exceed {max} characters")
            }
            Self::NotPositive(field) => write!(f, "`{field}` must be positive"),
            Self::Negative(field) => write!(f, "`{field}` must not be negative"),
            Self::InvalidRange(field) => write!(f, "`{field}` lower bound exceeds upper bound"),
            Self::InvalidEmail(value) => write!(f, "invalid email `{value}`"),
            Self::InvalidChild {
                collection,
                position,
                reason,
            } => write!(f, "{collection}[{position}]: {reason}"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn limit_len(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

pub(crate) fn positive(field: &'static str, value: Option<i32>) -> Result<(), ValidationError> {
    match value {
        Some(number) if number <= 0 => Err(ValidationError::NotPositive(field)),
        _ => Ok(()),
    }
}

pub(crate) fn child(
    collection: &'static str,
    position: usize,
    result: Result<(), ValidationError>,
) -> Result<(), ValidationError> {
    result.map_err(|reason| ValidationError::InvalidChild {
        collection,
        position,
        reason: Box::new(reason),
    })
}
