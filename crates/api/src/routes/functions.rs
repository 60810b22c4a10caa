use axum::routing::post;
use axum::Router;

use crate::handlers::functions;
use crate::state::AppState;

/// Mount the function endpoints (under `/functions/v1`).
///
/// ```text
/// POST /storybook-generation    Bearer token
/// POST /image-generation        x-webhook-secret
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/storybook-generation", post(functions::storybook_generation))
        .route("/image-generation", post(functions::image_generation))
}
