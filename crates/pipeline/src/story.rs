//! Story text stage: prompt to persisted story and queued pages.

use std::sync::Arc;

use serde::Serialize;
use curico_core::quiz::validate_prompt;
use curico_core::story_format::{parse_story, STORY_INSTRUCTION};
use curico_core::types::DbId;
use curico_events::{EventBus, IllustrationQueue, PipelineEvent};

use crate::error::PipelineError;
use crate::llm::StoryModel;
use crate::store::StoryStore;

/// Result of a successful generation request.
///
/// Returned as soon as rows are committed; illustrations continue in the
/// background.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedStory {
    pub story_id: DbId,
    pub title: String,
    pub pages_text: Vec<String>,
    pub page_count: usize,
}

/// Runs the text stage and hands pages to the illustration queue.
pub struct StoryGenerator {
    model: Arc<dyn StoryModel>,
    store: Arc<dyn StoryStore>,
    queue: IllustrationQueue,
    events: Arc<EventBus>,
}

impl StoryGenerator {
    pub fn new(
        model: Arc<dyn StoryModel>,
        store: Arc<dyn StoryStore>,
        queue: IllustrationQueue,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            model,
            store,
            queue,
            events,
        }
    }

    /// Generate, parse and persist a story for `owner_id`.
    ///
    /// Nothing is written when the model output has no pages. The model is
    /// called exactly once.
    pub async fn generate(
        &self,
        owner_id: DbId,
        prompt: &str,
    ) -> Result<GeneratedStory, PipelineError> {
        validate_prompt(prompt)?;

        tracing::info!(
            owner_id,
            model = self.model.model_name(),
            prompt_len = prompt.len(),
            "Generating story text",
        );
        let raw = self.model.complete(STORY_INSTRUCTION, prompt).await?;

        let parsed = parse_story(&raw).inspect_err(|_| {
            tracing::error!(owner_id, raw_len = raw.len(), "Model output contained no pages");
        })?;
        if !parsed.has_expected_length() {
            tracing::warn!(
                owner_id,
                page_count = parsed.pages.len(),
                "Story page count outside the requested range",
            );
        }

        let (story, pages) = self
            .store
            .create_story(owner_id, &parsed.title, &parsed.pages)
            .await?;

        self.events
            .publish(PipelineEvent::story_created(story.id, owner_id, pages.len()));
        let queued = self.queue.enqueue_pages(&pages);

        tracing::info!(
            story_id = story.id,
            owner_id,
            page_count = pages.len(),
            queued,
            "Story created, illustrations queued",
        );

        Ok(GeneratedStory {
            story_id: story.id,
            title: story.title,
            page_count: pages.len(),
            pages_text: parsed.pages,
        })
    }
}
