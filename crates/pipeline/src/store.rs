//! Persistence seams used by the pipeline.
//!
//! [`PgStore`] delegates to the repositories in `curico-db`; tests provide
//! in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use curico_core::types::DbId;
use curico_db::models::page::Page;
use curico_db::models::story::Story;
use curico_db::repositories::{PageRepo, StoryRepo, DEFAULT_CLAIM_LEASE};

/// Writes a story together with its pages.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Insert the story and its pending pages atomically.
    async fn create_story(
        &self,
        owner_id: DbId,
        title: &str,
        page_texts: &[String],
    ) -> Result<(Story, Vec<Page>), sqlx::Error>;
}

/// Page lookups and illustration status transitions.
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn find_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error>;

    /// `None` when the page is not pending, already has an image, or holds
    /// an unexpired claim.
    async fn claim_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error>;

    async fn complete_page(&self, id: DbId, image_url: &str)
        -> Result<Option<Page>, sqlx::Error>;

    async fn fail_page(&self, id: DbId, message: &str) -> Result<Option<Page>, sqlx::Error>;

    /// `None` when the page is not in the error status.
    async fn reset_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error>;

    /// Pending pages without an image and without a live claim, oldest
    /// first.
    async fn claimable_pages(&self, limit: i64) -> Result<Vec<Page>, sqlx::Error>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    claim_lease: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }
}

#[async_trait]
impl StoryStore for PgStore {
    async fn create_story(
        &self,
        owner_id: DbId,
        title: &str,
        page_texts: &[String],
    ) -> Result<(Story, Vec<Page>), sqlx::Error> {
        StoryRepo::create_with_pages(&self.pool, owner_id, title, page_texts).await
    }
}

#[async_trait]
impl PageStore for PgStore {
    async fn find_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        PageRepo::find_by_id(&self.pool, id).await
    }

    async fn claim_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        PageRepo::claim(&self.pool, id, self.claim_lease).await
    }

    async fn complete_page(
        &self,
        id: DbId,
        image_url: &str,
    ) -> Result<Option<Page>, sqlx::Error> {
        PageRepo::complete(&self.pool, id, image_url).await
    }

    async fn fail_page(&self, id: DbId, message: &str) -> Result<Option<Page>, sqlx::Error> {
        PageRepo::fail(&self.pool, id, message).await
    }

    async fn reset_page(&self, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        PageRepo::reset_for_retry(&self.pool, id).await
    }

    async fn claimable_pages(&self, limit: i64) -> Result<Vec<Page>, sqlx::Error> {
        PageRepo::list_claimable(&self.pool, limit, self.claim_lease).await
    }
}
