use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use curico_core::error::CoreError;
use curico_core::types::DbId;
use curico_db::repositories::{PageRepo, StoryRepo};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::auth::jwt::validate_token;
use crate::error::{AppError, AppResult};
use crate::handlers::stories::progress_snapshot;
use crate::state::AppState;
use crate::ws::messages::{self, ClientMessage};

/// Query parameters of the upgrade request. Browsers cannot set headers on
/// a WebSocket handshake, so the access token travels in the URL.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// HTTP handler that authenticates the caller and upgrades the connection.
///
/// After the upgrade the connection is registered with `WsManager` and
/// driven by a sender task plus the receive loop below.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> AppResult<impl IntoResponse> {
    let token = params.token.ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("Missing token query parameter".into()))
    })?;
    let claims = validate_token(&token, &state.config.jwt).map_err(|_| {
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// 1. Registers the connection with `WsManager`.
/// 2. Spawns a sender task that forwards messages from the manager channel.
/// 3. Processes subscribe/unsubscribe frames on the current task.
/// 4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket connected");

    let ws_manager = state.ws_manager.clone();
    let mut rx = ws_manager.add(conn_id.clone(), user_id).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &conn_id, user_id, text.as_str()).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Handle one text frame from `conn_id`. Replies go through `WsManager`.
pub async fn handle_client_message(state: &AppState, conn_id: &str, user_id: DbId, text: &str) {
    let ws_manager = &state.ws_manager;
    match messages::parse_client_message(text) {
        Ok(ClientMessage::Subscribe { story_id }) => {
            let reply = match subscribe(state, conn_id, user_id, story_id).await {
                Ok(reply) => reply,
                Err(message) => messages::error(&message),
            };
            ws_manager.send_to(conn_id, reply).await;
        }
        Ok(ClientMessage::Unsubscribe) => {
            ws_manager.unsubscribe(conn_id).await;
            tracing::debug!(conn_id, "Story subscription dropped");
        }
        Err(e) => {
            tracing::debug!(conn_id, error = %e, "Unrecognized WebSocket frame");
            ws_manager
                .send_to(conn_id, messages::error("Unrecognized message"))
                .await;
        }
    }
}

/// Subscribe `conn_id` to a story the caller owns and build the snapshot
/// frame. Errors are returned as client-facing text.
///
/// The subscription is registered before the pages are read, so every
/// change after the read is also delivered as a `page_updated` frame.
async fn subscribe(
    state: &AppState,
    conn_id: &str,
    user_id: DbId,
    story_id: DbId,
) -> Result<Message, String> {
    StoryRepo::find_by_id(&state.pool, story_id)
        .await
        .map_err(|e| {
            tracing::error!(story_id, error = %e, "Failed to load story for subscription");
            "Failed to load story".to_string()
        })?
        .filter(|story| story.owner_id == user_id)
        .ok_or_else(|| format!("Story {story_id} not found"))?;

    state.ws_manager.subscribe(conn_id, story_id).await;

    let pages = match PageRepo::list_by_story(&state.pool, story_id).await {
        Ok(pages) => pages,
        Err(e) => {
            tracing::error!(story_id, error = %e, "Failed to load pages for subscription");
            state.ws_manager.unsubscribe(conn_id).await;
            return Err("Failed to load story".to_string());
        }
    };
    tracing::info!(conn_id, story_id, "Subscribed to story updates");

    let snapshot = progress_snapshot(story_id, &pages);
    Ok(messages::story_snapshot(&snapshot, &pages))
}
