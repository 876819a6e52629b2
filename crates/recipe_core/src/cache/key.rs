//! Cache key scheme.
//!
//! - `<entity>:<id>` singular item
//! - `<entity>:list` unqualified collection
//! - `<entity>:list:<qualifier>` filtered or paginated collection
//! - `<entity>:<field>:<value>` secondary lookup of a singular item

use std::fmt::{Display, Formatter};

/// Entity classes with their own key namespace and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEntity {
    User,
    Recipe,
    Ingredient,
    Tag,
    BoardPost,
}

impl CacheEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Recipe => "recipe",
            Self::Ingredient => "ingredient",
            Self::Tag => "tag",
            Self::BoardPost => "board_post",
        }
    }

    /// Prefix shared by every key of this entity, item and list alike.
    pub fn namespace(self) -> String {
        format!("{}:", self.as_str())
    }

    /// Prefix shared by every qualified list key of this entity.
    pub fn qualified_list_prefix(self) -> String {
        format!("{}:list:", self.as_str())
    }
}

impl Display for CacheEntity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn item(entity: CacheEntity, id: i64) -> Self {
        Self(format!("{}:{id}", entity.as_str()))
    }

    pub fn list(entity: CacheEntity) -> Self {
        Self(format!("{}:list", entity.as_str()))
    }

    pub fn qualified_list(entity: CacheEntity, qualifier: &str) -> Self {
        Self(format!("{}:list:{qualifier}", entity.as_str()))
    }

    pub fn lookup(entity: CacheEntity, field: &str, value: &str) -> Self {
        Self(format!("{}:{field}:{value}", entity.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheEntity, CacheKey};

    #[test]
    fn keys_follow_entity_scheme() {
        assert_eq!(CacheKey::item(CacheEntity::Recipe, 7).as_str(), "recipe:7");
        assert_eq!(CacheKey::list(CacheEntity::Recipe).as_str(), "recipe:list");
        assert_eq!(
            CacheKey::qualified_list(CacheEntity::Recipe, "top:10").as_str(),
            "recipe:list:top:10"
        );
        assert_eq!(
            CacheKey::lookup(CacheEntity::User, "username", "kim").as_str(),
            "user:username:kim"
        );
        assert_eq!(
            CacheEntity::BoardPost.qualified_list_prefix(),
            "board_post:list:"
        );
    }
}
