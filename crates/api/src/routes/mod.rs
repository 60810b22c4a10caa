pub mod functions;
pub mod health;
pub mod stories;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                          WebSocket (?token=<JWT>)
///
/// /stories                                     list, create
/// /stories/{id}                                get
/// /stories/{id}/status                         progress snapshot
/// /stories/{id}/pages/{page_id}/retry          retry a failed page (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/stories", stories::router())
}
