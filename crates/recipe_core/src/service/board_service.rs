//! Community board service.

use crate::cache::key::{CacheEntity, CacheKey};
use crate::cache::CacheLayer;
use crate::model::board_post::{BoardPost, BoardPostId, BoardPostInput};
use crate::model::validation::ValidationError;
use crate::repo::board_repo::{BoardPostFilter, BoardPostListQuery, BoardPostRepository};
use crate::repo::Page;
use crate::service::error::{ServiceError, ServiceResult};

pub struct BoardPostService<R: BoardPostRepository> {
    repo: R,
    cache: CacheLayer,
}

impl<R: BoardPostRepository> BoardPostService<R> {
    pub fn new(repo: R, cache: CacheLayer) -> Self {
        Self { repo, cache }
    }

    pub fn create_post(&self, input: &BoardPostInput) -> ServiceResult<BoardPost> {
        let id = self.repo.create_post(input)?;
        self.cache.invalidation().after_create(CacheEntity::BoardPost);
        self.repo.get_post(id)?.ok_or(ServiceError::InconsistentState(
            "created post not found in read-back",
        ))
    }

    /// Reads one post through the cache. Does not count a view; callers that
    /// display the post pair this with [`Self::record_view`].
    pub fn get_post(&self, id: BoardPostId) -> ServiceResult<BoardPost> {
        self.cache.accessor().get_or_load(
            &CacheKey::item(CacheEntity::BoardPost, id),
            self.cache.ttl(CacheEntity::BoardPost),
            || {
                self.repo
                    .get_post(id)?
                    .ok_or_else(|| ServiceError::not_found("board_post", id))
            },
        )
    }

    /// Every post, pinned first, then newest.
    pub fn list_posts(&self) -> ServiceResult<Vec<BoardPost>> {
        let query = BoardPostListQuery::default();
        self.cache.accessor().get_or_load(
            &CacheKey::list(CacheEntity::BoardPost),
            self.cache.ttl(CacheEntity::BoardPost),
            || Ok(self.repo.list_posts(&query)?),
        )
    }

    pub fn list_posts_page(&self, page: Page) -> ServiceResult<Vec<BoardPost>> {
        self.list_cached(BoardPostListQuery::new(BoardPostFilter::All, Some(page)))
    }

    pub fn list_pinned_posts(&self) -> ServiceResult<Vec<BoardPost>> {
        self.list_cached(BoardPostListQuery::new(BoardPostFilter::PinnedOnly, None))
    }

    pub fn list_posts_by_author(&self, author_id: i64) -> ServiceResult<Vec<BoardPost>> {
        self.list_cached(BoardPostListQuery::new(
            BoardPostFilter::Author(author_id),
            None,
        ))
    }

    /// Title or content substring search. Never cached.
    pub fn search_posts(&self, keyword: &str) -> ServiceResult<Vec<BoardPost>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ValidationError::EmptyField("keyword").into());
        }
        Ok(self.repo.list_posts(&BoardPostListQuery::new(
            BoardPostFilter::Keyword(keyword.to_string()),
            None,
        ))?)
    }

    pub fn count_posts_by_author(&self, author_id: i64) -> ServiceResult<u64> {
        Ok(self.repo.count_posts_by_author(author_id)?)
    }

    pub fn update_post(&self, id: BoardPostId, input: &BoardPostInput) -> ServiceResult<BoardPost> {
        self.repo.update_post(id, input)?;
        self.cache
            .invalidation()
            .after_update(CacheEntity::BoardPost, id, &[]);
        self.repo.get_post(id)?.ok_or(ServiceError::InconsistentState(
            "updated post not found in read-back",
        ))
    }

    pub fn delete_post(&self, id: BoardPostId) -> ServiceResult<()> {
        self.repo.delete_post(id)?;
        self.cache
            .invalidation()
            .after_delete(CacheEntity::BoardPost, id, &[]);
        Ok(())
    }

    /// Counts one view. Kept apart from [`Self::get_post`] so reads stay
    /// side-effect free and can be served from the cache.
    ///
    /// Only the item key is evicted; cached lists keep their stale counters
    /// until TTL.
    pub fn record_view(&self, id: BoardPostId) -> ServiceResult<()> {
        self.repo.increment_view_count(id)?;
        self.cache
            .invalidation()
            .evict_item(CacheEntity::BoardPost, id, &[]);
        Ok(())
    }

    fn list_cached(&self, query: BoardPostListQuery) -> ServiceResult<Vec<BoardPost>> {
        match query.cache_qualifier() {
            Some(qualifier) => self.cache.accessor().get_or_load(
                &CacheKey::qualified_list(CacheEntity::BoardPost, &qualifier),
                self.cache.ttl(CacheEntity::BoardPost),
                || Ok(self.repo.list_posts(&query)?),
            ),
            None => Ok(self.repo.list_posts(&query)?),
        }
    }
}
