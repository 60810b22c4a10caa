use axum::routing::{get, post};
use axum::Router;

use crate::handlers::stories;
use crate::state::AppState;

/// Mount story routes (under `/api/v1/stories`).
///
/// ```text
/// GET  /                               list_stories
/// POST /                               create_story
/// GET  /{id}                           get_story
/// GET  /{id}/status                    get_story_status
/// POST /{id}/pages/{page_id}/retry     retry_page
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stories::list_stories).post(stories::create_story))
        .route("/{id}", get(stories::get_story))
        .route("/{id}/status", get(stories::get_story_status))
        .route("/{id}/pages/{page_id}/retry", post(stories::retry_page))
}
