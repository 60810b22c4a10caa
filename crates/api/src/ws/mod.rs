//! WebSocket infrastructure for story progress streaming.
//!
//! Provides connection management with per-connection story
//! subscriptions, heartbeat monitoring, and the HTTP upgrade handler.

mod handler;
mod heartbeat;
pub mod messages;
pub mod manager;

pub use handler::{handle_client_message, ws_handler};
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
