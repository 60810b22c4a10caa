//! Illustration stage: one page to one stored image.

use std::sync::Arc;

use curico_core::error::CoreError;
use curico_core::naming::page_image_key;
use curico_core::types::DbId;
use curico_db::models::page::{Page, PageRecord};
use curico_events::{EventBus, PipelineEvent};

use crate::error::PipelineError;
use crate::images::{illustration_prompt, ImageModel};
use crate::storage::{sniff_image, ObjectStore};
use crate::store::PageStore;

/// Longest error text stored on a failed page.
const MAX_ERROR_MESSAGE_LEN: usize = 1_000;

/// Why an illustration request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The record is complete or already has an image.
    AlreadyProcessed,
    /// The row could not be claimed: another attempt owns it or it moved on.
    NotClaimable,
}

impl SkipReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::AlreadyProcessed => "Page already has an image",
            Self::NotClaimable => "Page is already being processed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum IllustrationOutcome {
    Completed { page: Page, url: String },
    Skipped(SkipReason),
}

/// Generates, stores and records the illustration of a page.
#[derive(Clone)]
pub struct Illustrator {
    store: Arc<dyn PageStore>,
    images: Arc<dyn ImageModel>,
    objects: Arc<dyn ObjectStore>,
    events: Arc<EventBus>,
}

impl Illustrator {
    pub fn new(
        store: Arc<dyn PageStore>,
        images: Arc<dyn ImageModel>,
        objects: Arc<dyn ObjectStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            images,
            objects,
            events,
        }
    }

    /// Illustrate the page described by `record`.
    ///
    /// Returns early without calling the image model when the record is
    /// already processed or the row cannot be claimed. After a successful
    /// claim the work runs on its own task, so the row ends up `complete`
    /// or `error` even if the caller goes away. Unknown page ids are
    /// reported as [`PipelineError::PageNotFound`].
    pub async fn illustrate(
        &self,
        record: &PageRecord,
    ) -> Result<IllustrationOutcome, PipelineError> {
        if record.is_processed() {
            tracing::debug!(page_id = record.id, "Page already processed, skipping");
            return Ok(IllustrationOutcome::Skipped(SkipReason::AlreadyProcessed));
        }

        let Some(page) = self.store.claim_page(record.id).await? else {
            if self.store.find_page(record.id).await?.is_none() {
                return Err(PipelineError::PageNotFound(record.id));
            }
            tracing::debug!(page_id = record.id, "Page not claimable, skipping");
            return Ok(IllustrationOutcome::Skipped(SkipReason::NotClaimable));
        };

        let worker = self.clone();
        tokio::spawn(async move { worker.finish(page).await }).await?
    }

    /// Render a claimed page and record the result on its row.
    async fn finish(&self, page: Page) -> Result<IllustrationOutcome, PipelineError> {
        match self.render_and_store(&page).await {
            Ok((page, url)) => {
                tracing::info!(
                    page_id = page.id,
                    story_id = page.story_id,
                    url = %url,
                    "Page illustrated",
                );
                self.events.publish(PipelineEvent::page_updated(page.clone()));
                Ok(IllustrationOutcome::Completed { page, url })
            }
            Err(e) => {
                self.record_failure(&page, &e).await;
                Err(e)
            }
        }
    }

    /// Load a page by id and illustrate it.
    pub async fn illustrate_by_id(
        &self,
        page_id: DbId,
    ) -> Result<IllustrationOutcome, PipelineError> {
        let page = self
            .store
            .find_page(page_id)
            .await?
            .ok_or(PipelineError::PageNotFound(page_id))?;
        self.illustrate(&PageRecord::from(&page)).await
    }

    /// Put an `error` page back to `pending` and announce it.
    ///
    /// The caller is responsible for queueing the page again.
    pub async fn reset_for_retry(&self, page_id: DbId) -> Result<Page, PipelineError> {
        let page = self.store.reset_page(page_id).await?.ok_or_else(|| {
            CoreError::Conflict(format!("Page {page_id} is not in error status"))
        })?;
        tracing::info!(page_id, story_id = page.story_id, "Page reset for retry");
        self.events.publish(PipelineEvent::page_updated(page.clone()));
        Ok(page)
    }

    async fn render_and_store(&self, page: &Page) -> Result<(Page, String), PipelineError> {
        let bytes = self
            .images
            .generate(&illustration_prompt(&page.content_text))
            .await?;
        let kind = sniff_image(&bytes)?;

        let key = page_image_key(page.story_id, page.id, kind.extension);
        self.objects.put(&key, bytes, kind.content_type).await?;
        let url = self.objects.public_url(&key);

        let updated = self
            .store
            .complete_page(page.id, &url)
            .await?
            .ok_or(PipelineError::PageNotFound(page.id))?;
        Ok((updated, url))
    }

    async fn record_failure(&self, page: &Page, error: &PipelineError) {
        tracing::error!(
            page_id = page.id,
            story_id = page.story_id,
            error = %error,
            "Illustration failed",
        );
        let message = truncate(&error.to_string(), MAX_ERROR_MESSAGE_LEN);
        match self.store.fail_page(page.id, &message).await {
            Ok(Some(failed)) => self.events.publish(PipelineEvent::page_updated(failed)),
            Ok(None) => {
                tracing::warn!(page_id = page.id, "Page left pending status before failure was recorded");
            }
            Err(e) => {
                tracing::error!(page_id = page.id, error = %e, "Failed to record illustration failure");
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
