//! User account record.
//!
//! Credentials and token issuance live outside this crate; only profile data
//! is persisted and cached here.

use crate::model::validation::{limit_len, require_text, ValidationError};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

pub const USERNAME_MAX_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_corporate: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Write input for registration and profile replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub is_corporate: bool,
}

impl UserInput {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            is_corporate: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("username", &self.username)?;
        limit_len("username", Some(self.username.trim()), USERNAME_MAX_CHARS)?;
        require_text("email", &self.email)?;
        if !looks_like_email(self.email.trim()) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::UserInput;
    use crate::model::validation::ValidationError;

    #[test]
    fn validate_rejects_email_without_domain() {
        let input = UserInput::new("cook", "cook@");
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn validate_accepts_plain_address() {
        UserInput::new("cook", "cook@example.com").validate().unwrap();
    }
}
