//! Repository for the `pages` table.
//!
//! Every status literal comes from `PageStatus`. Illustration writes are
//! conditional on the current status so concurrent attempts cannot
//! overwrite each other.

use std::time::Duration;

use sqlx::PgPool;
use curico_core::types::DbId;

use crate::models::page::Page;
use crate::models::status::PageStatus;

/// Column list for `pages` queries.
pub(crate) const COLUMNS: &str = "\
    id, story_id, page_num, content_text, image_url, status_id, \
    error_message, claimed_at, completed_at, created_at, updated_at";

/// How long a claim protects a page. A page whose claimant died is
/// claimable again once the lease runs out. Must exceed the image model
/// timeout.
pub const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(600);

/// Provides page lookups and the illustration status transitions.
pub struct PageRepo;

impl PageRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All pages of a story in reading order.
    pub async fn list_by_story(pool: &PgPool, story_id: DbId) -> Result<Vec<Page>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM pages WHERE story_id = $1 ORDER BY page_num ASC");
        sqlx::query_as::<_, Page>(&query)
            .bind(story_id)
            .fetch_all(pool)
            .await
    }

    /// Pages of several stories, grouped by story and in reading order.
    pub async fn list_by_stories(
        pool: &PgPool,
        story_ids: &[DbId],
    ) -> Result<Vec<Page>, sqlx::Error> {
        if story_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM pages \
             WHERE story_id = ANY($1) \
             ORDER BY story_id ASC, page_num ASC"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(story_ids)
            .fetch_all(pool)
            .await
    }

    /// Take ownership of a page for illustration.
    ///
    /// Sets `claimed_at` only when the page is still pending, has no image
    /// and carries no claim younger than `lease`. Returns `None` when another
    /// attempt owns the row or it was already processed.
    pub async fn claim(
        pool: &PgPool,
        id: DbId,
        lease: Duration,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "UPDATE pages SET claimed_at = NOW() \
             WHERE id = $1 \
               AND status_id = $2 \
               AND image_url IS NULL \
               AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $3)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(PageStatus::Pending.id())
            .bind(lease.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Store the permanent image URL and mark the page complete.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        image_url: &str,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "UPDATE pages \
             SET image_url = $2, status_id = $3, error_message = NULL, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(image_url)
            .bind(PageStatus::Complete.id())
            .bind(PageStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a pending page as failed.
    ///
    /// No automatic retry is performed. The page stays in `Error` until its
    /// owner resets it with [`PageRepo::reset_for_retry`].
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "UPDATE pages \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(PageStatus::Error.id())
            .bind(message)
            .bind(PageStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Pending pages without an image that are unclaimed or whose claim
    /// is older than `lease`, oldest first.
    pub async fn list_claimable(
        pool: &PgPool,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages \
             WHERE status_id = $1 AND image_url IS NULL \
               AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $3)) \
             ORDER BY created_at ASC, id ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(PageStatus::Pending.id())
            .bind(limit)
            .bind(lease.as_secs_f64())
            .fetch_all(pool)
            .await
    }

    /// Put an `Error` page back to `Pending` so it can be illustrated again.
    ///
    /// Returns `None` when the page is not in the error status.
    pub async fn reset_for_retry(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "UPDATE pages \
             SET status_id = $2, claimed_at = NULL, error_message = NULL, completed_at = NULL \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(PageStatus::Pending.id())
            .bind(PageStatus::Error.id())
            .fetch_optional(pool)
            .await
    }
}
