//! WebSocket message type constants for story progress streaming.
//!
//! Shared by the API's notification relay and WebSocket handler so the
//! client contract is spelled out in one place.

/// Client -> server: start receiving updates for one story.
pub const MSG_TYPE_SUBSCRIBE: &str = "subscribe";

/// Client -> server: stop receiving story updates.
pub const MSG_TYPE_UNSUBSCRIBE: &str = "unsubscribe";

/// Server -> client: current status snapshot, sent right after subscribing.
pub const MSG_TYPE_STORY_SNAPSHOT: &str = "story_snapshot";

/// Server -> client: a page row of the subscribed story was updated.
pub const MSG_TYPE_PAGE_UPDATED: &str = "page_updated";

/// Server -> client: a subscription request was rejected.
pub const MSG_TYPE_ERROR: &str = "error";
