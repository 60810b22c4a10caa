//! Handlers for the `/functions/v1` endpoints.
//!
//! These keep the flat response bodies the web client and the database
//! webhook already speak: `{ success, ... }` on success and
//! `{ error, code }` on failure.

use axum::extract::State;
use axum::Json;
use curico_db::models::page::PageRecord;
use curico_pipeline::{GeneratedStory, IllustrationOutcome};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::webhook::WebhookAuth;
use crate::state::AppState;

/// Request body for the storybook generation endpoint.
#[derive(Debug, Deserialize)]
pub struct StorybookGenerationRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct StorybookGenerationResponse {
    pub success: bool,
    #[serde(flatten)]
    pub story: GeneratedStory,
    pub message: String,
}

/// Request body for the illustration webhook: the inserted page row.
#[derive(Debug, Deserialize)]
pub struct ImageGenerationRequest {
    pub record: PageRecord,
}

#[derive(Debug, Serialize)]
pub struct ImageGenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /functions/v1/storybook-generation
///
/// Generate story text for the caller, store the story and its pending
/// pages, and queue the illustrations. Answers once the rows are stored.
pub async fn storybook_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StorybookGenerationRequest>,
) -> AppResult<Json<StorybookGenerationResponse>> {
    let story = state
        .pipeline
        .generator
        .generate(auth.user_id, &input.prompt)
        .await?;

    let message = format!(
        "Story generated with {} pages. Images are being generated.",
        story.page_count
    );
    Ok(Json(StorybookGenerationResponse {
        success: true,
        story,
        message,
    }))
}

/// POST /functions/v1/image-generation
///
/// Illustrate one page. Already processed or claimed pages return a
/// `skipped` success without calling the image model.
pub async fn image_generation(
    _webhook: WebhookAuth,
    State(state): State<AppState>,
    Json(input): Json<ImageGenerationRequest>,
) -> AppResult<Json<ImageGenerationResponse>> {
    let outcome = state.pipeline.illustrator.illustrate(&input.record).await?;

    let response = match outcome {
        IllustrationOutcome::Completed { url, .. } => ImageGenerationResponse {
            success: true,
            url: Some(url),
            skipped: None,
            message: None,
        },
        IllustrationOutcome::Skipped(reason) => {
            tracing::info!(
                page_id = input.record.id,
                reason = reason.message(),
                "Illustration skipped",
            );
            ImageGenerationResponse {
                success: true,
                url: None,
                skipped: Some(true),
                message: Some(reason.message().to_string()),
            }
        }
    };
    Ok(Json(response))
}
