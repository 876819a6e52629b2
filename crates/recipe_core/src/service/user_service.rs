//! User profile service.
//!
//! # Invariants
//! - A user is cached under `user:<id>` and, when fetched by name, under
//!   `user:username:<name>`; writes evict both.
//! - Registration rejects a taken username or email with `Conflict` before
//!   touching the store; the unique index still backs the check.

use crate::cache::key::{CacheEntity, CacheKey};
use crate::cache::CacheLayer;
use crate::model::user::{User, UserId, UserInput};
use crate::repo::user_repo::{UserListQuery, UserRepository};
use crate::service::error::{ServiceError, ServiceResult};
use log::info;

pub struct UserService<R: UserRepository> {
    repo: R,
    cache: CacheLayer,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R, cache: CacheLayer) -> Self {
        Self { repo, cache }
    }

    pub fn register_user(&self, input: &UserInput) -> ServiceResult<User> {
        input.validate()?;
        if self.repo.exists_by_username(&input.username)? {
            return Err(conflict("username", input.username.trim()));
        }
        if self.repo.exists_by_email(&input.email)? {
            return Err(conflict("email", input.email.trim()));
        }

        let id = self.repo.create_user(input)?;
        self.cache.invalidation().after_create(CacheEntity::User);
        info!("event=user_register module=service status=ok user_id={}", id);

        self.repo.get_user(id)?.ok_or(ServiceError::InconsistentState(
            "registered user not found in read-back",
        ))
    }

    pub fn get_user(&self, id: UserId) -> ServiceResult<User> {
        self.cache.accessor().get_or_load(
            &CacheKey::item(CacheEntity::User, id),
            self.cache.ttl(CacheEntity::User),
            || {
                self.repo
                    .get_user(id)?
                    .ok_or_else(|| ServiceError::not_found("user", id))
            },
        )
    }

    pub fn get_user_by_username(&self, username: &str) -> ServiceResult<User> {
        let username = username.trim();
        self.cache.accessor().get_or_load(
            &username_key(username),
            self.cache.ttl(CacheEntity::User),
            || {
                self.repo
                    .find_by_username(username)?
                    .ok_or_else(|| ServiceError::not_found("user", username))
            },
        )
    }

    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        let query = UserListQuery::default();
        self.cache.accessor().get_or_load(
            &CacheKey::list(CacheEntity::User),
            self.cache.ttl(CacheEntity::User),
            || Ok(self.repo.list_users(&query)?),
        )
    }

    pub fn list_corporate_users(&self) -> ServiceResult<Vec<User>> {
        let query = UserListQuery {
            corporate_only: true,
            page: None,
        };
        self.cache.accessor().get_or_load(
            &CacheKey::qualified_list(CacheEntity::User, &query.cache_qualifier()),
            self.cache.ttl(CacheEntity::User),
            || Ok(self.repo.list_users(&query)?),
        )
    }

    pub fn exists_by_username(&self, username: &str) -> ServiceResult<bool> {
        Ok(self.repo.exists_by_username(username)?)
    }

    pub fn exists_by_email(&self, email: &str) -> ServiceResult<bool> {
        Ok(self.repo.exists_by_email(email)?)
    }

    /// Replaces the profile. Evicts lookups under both the old and the new
    /// username.
    pub fn update_user(&self, id: UserId, input: &UserInput) -> ServiceResult<User> {
        let current = self
            .repo
            .get_user(id)?
            .ok_or_else(|| ServiceError::not_found("user", id))?;
        self.repo.update_user(id, input)?;

        let mut lookups = vec![username_key(&current.username)];
        let renamed = input.username.trim();
        if renamed != current.username {
            lookups.push(username_key(renamed));
        }
        self.cache
            .invalidation()
            .after_update(CacheEntity::User, id, &lookups);

        self.repo.get_user(id)?.ok_or(ServiceError::InconsistentState(
            "updated user not found in read-back",
        ))
    }

    pub fn delete_user(&self, id: UserId) -> ServiceResult<()> {
        let current = self
            .repo
            .get_user(id)?
            .ok_or_else(|| ServiceError::not_found("user", id))?;
        self.repo.delete_user(id)?;
        self.cache.invalidation().after_delete(
            CacheEntity::User,
            id,
            &[username_key(&current.username)],
        );
        Ok(())
    }
}

fn username_key(username: &str) -> CacheKey {
    CacheKey::lookup(CacheEntity::User, "username", username)
}

fn conflict(field: &'static str, value: &str) -> ServiceError {
    ServiceError::Conflict {
        entity: "user",
        field,
        value: value.to_string(),
    }
}
