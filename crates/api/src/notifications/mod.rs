//! Event bus to WebSocket fan-out.

mod relay;

pub use relay::PageRelay;
