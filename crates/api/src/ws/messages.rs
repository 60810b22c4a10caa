//! JSON frames exchanged on the progress socket.

use axum::extract::ws::Message;
use curico_core::page_events::{
    MSG_TYPE_ERROR, MSG_TYPE_PAGE_UPDATED, MSG_TYPE_STORY_SNAPSHOT,
};
use curico_core::progress::ProgressSnapshot;
use curico_core::types::DbId;
use curico_db::models::page::Page;
use serde::Deserialize;
use serde_json::json;

/// A frame sent by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { story_id: DbId },
    Unsubscribe,
}

/// Parse an inbound text frame.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// `page_updated`: the full row of a page that changed.
pub fn page_updated(page: &Page) -> Message {
    text(json!({
        "type": MSG_TYPE_PAGE_UPDATED,
        "story_id": page.story_id,
        "page": page,
    }))
}

/// `story_snapshot`: counts plus current rows, sent after subscribing.
pub fn story_snapshot(snapshot: &ProgressSnapshot, pages: &[Page]) -> Message {
    text(json!({
        "type": MSG_TYPE_STORY_SNAPSHOT,
        "story_id": snapshot.story_id,
        "snapshot": snapshot,
        "pages": pages,
    }))
}

/// `error`: a rejected client request. The socket stays open.
pub fn error(message: &str) -> Message {
    text(json!({
        "type": MSG_TYPE_ERROR,
        "message": message,
    }))
}

fn text(value: serde_json::Value) -> Message {
    Message::Text(value.to_string().into())
}
