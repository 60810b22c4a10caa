//! Handlers for the `/stories` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Callers only see
//! and modify their own stories.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use curico_core::error::CoreError;
use curico_core::progress::{PageUpdate, ProgressSnapshot, ProgressTracker};
use curico_core::quiz::{assemble_prompt, QuizAnswer};
use curico_core::types::DbId;
use curico_db::models::page::Page;
use curico_db::models::story::StoryWithPages;
use curico_db::repositories::{PageRepo, StoryRepo};
use curico_events::PageTask;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /stories`: quiz answers or a ready prompt.
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    #[serde(default)]
    pub answers: Option<Vec<QuizAnswer>>,
    #[serde(default)]
    pub prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a story with its pages and verify the caller owns it.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    story_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<StoryWithPages> {
    let story = StoryRepo::find_with_pages(pool, story_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Story",
            id: story_id,
        }))?;

    if story.story.owner_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's story"
        ))));
    }

    Ok(story)
}

/// Progress of a story computed from its current page rows.
pub fn progress_snapshot(story_id: DbId, pages: &[Page]) -> ProgressSnapshot {
    let updates: Vec<PageUpdate> = pages.iter().map(Page::progress_update).collect();
    ProgressTracker::from_snapshot(story_id, &updates).snapshot()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/stories
///
/// Generate a story from quiz answers (or a free prompt) and return 201
/// once the text and page rows are stored. Illustrations run in the
/// background.
pub async fn create_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateStoryRequest>,
) -> AppResult<impl IntoResponse> {
    let prompt = match (input.answers, input.prompt) {
        (Some(answers), _) => assemble_prompt(&answers)?,
        (None, Some(prompt)) => prompt,
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either answers or prompt is required".into(),
            ))
        }
    };

    let story = state.pipeline.generator.generate(auth.user_id, &prompt).await?;

    tracing::info!(
        story_id = story.story_id,
        page_count = story.page_count,
        user_id = auth.user_id,
        "Story created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: story })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/stories
///
/// The caller's stories, newest first, each with its pages.
pub async fn list_stories(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stories = StoryRepo::list_with_pages_by_owner(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: stories }))
}

/// GET /api/v1/stories/{id}
pub async fn get_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let story = find_and_authorize(&state.pool, story_id, &auth, "view").await?;
    Ok(Json(DataResponse { data: story }))
}

/// GET /api/v1/stories/{id}/status
///
/// Synchronous progress snapshot, for clients resuming after a reload.
pub async fn get_story_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let story = find_and_authorize(&state.pool, story_id, &auth, "view").await?;
    let snapshot = progress_snapshot(story_id, &story.pages);
    Ok(Json(DataResponse { data: snapshot }))
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// POST /api/v1/stories/{id}/pages/{page_id}/retry
///
/// Put a failed page back to `pending` and queue it again. Returns 202;
/// 409 if the page is not in `error` status.
pub async fn retry_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((story_id, page_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, story_id, &auth, "retry pages of").await?;

    let page = PageRepo::find_by_id(&state.pool, page_id)
        .await?
        .filter(|p| p.story_id == story_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Page",
            id: page_id,
        }))?;

    let page = state.pipeline.illustrator.reset_for_retry(page.id).await?;
    let queued = state.pipeline.queue.enqueue(PageTask::from(&page));

    tracing::info!(
        story_id,
        page_id,
        queued,
        user_id = auth.user_id,
        "Page queued for retry",
    );

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: page })))
}
