//! Repository for the `stories` table.

use std::collections::HashMap;

use sqlx::PgPool;
use curico_core::types::DbId;

use super::page_repo::{self, PageRepo};
use crate::models::page::Page;
use crate::models::status::PageStatus;
use crate::models::story::{Story, StoryWithPages};

/// Column list for `stories` queries.
const COLUMNS: &str = "id, title, owner_id, created_at, updated_at";

/// Provides story creation and the reader queries.
pub struct StoryRepo;

impl StoryRepo {
    /// Insert a story and one pending page per text, in one transaction.
    ///
    /// Page numbers follow slice order starting at 1. If any insert fails
    /// the transaction is rolled back and no story row remains.
    pub async fn create_with_pages(
        pool: &PgPool,
        owner_id: DbId,
        title: &str,
        page_texts: &[String],
    ) -> Result<(Story, Vec<Page>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO stories (title, owner_id) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let story = sqlx::query_as::<_, Story>(&query)
            .bind(title)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?;

        let page_nums: Vec<i32> = (1..=page_texts.len() as i32).collect();
        let query = format!(
            "INSERT INTO pages (story_id, page_num, content_text, status_id) \
             SELECT $1, t.page_num, t.content_text, $2 \
             FROM UNNEST($3::INTEGER[], $4::TEXT[]) AS t(page_num, content_text) \
             RETURNING {}",
            page_repo::COLUMNS
        );
        let mut pages = sqlx::query_as::<_, Page>(&query)
            .bind(story.id)
            .bind(PageStatus::Pending.id())
            .bind(&page_nums)
            .bind(page_texts)
            .fetch_all(&mut *tx)
            .await?;
        pages.sort_by_key(|p| p.page_num);

        tx.commit().await?;

        tracing::debug!(story_id = story.id, page_count = pages.len(), "Story inserted");
        Ok((story, pages))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = $1");
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A story and its pages ordered by `page_num`.
    pub async fn find_with_pages(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<StoryWithPages>, sqlx::Error> {
        let Some(story) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let pages = PageRepo::list_by_story(pool, id).await?;
        Ok(Some(StoryWithPages { story, pages }))
    }

    /// The owner's stories, newest first.
    pub async fn list_by_owner(pool: &PgPool, owner_id: DbId) -> Result<Vec<Story>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stories WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// The owner's stories, newest first, each with its ordered pages.
    pub async fn list_with_pages_by_owner(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<StoryWithPages>, sqlx::Error> {
        let stories = Self::list_by_owner(pool, owner_id).await?;
        let ids: Vec<DbId> = stories.iter().map(|s| s.id).collect();

        let mut by_story: HashMap<DbId, Vec<Page>> = HashMap::new();
        for page in PageRepo::list_by_stories(pool, &ids).await? {
            by_story.entry(page.story_id).or_default().push(page);
        }

        Ok(stories
            .into_iter()
            .map(|story| {
                let pages = by_story.remove(&story.id).unwrap_or_default();
                StoryWithPages { story, pages }
            })
            .collect())
    }
}
