use std::sync::Arc;

use curico_pipeline::Pipeline;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: curico_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Change notifier for page and story updates.
    pub event_bus: Arc<curico_events::EventBus>,
    /// Story generator, illustrator and the illustration queue.
    pub pipeline: Pipeline,
}
