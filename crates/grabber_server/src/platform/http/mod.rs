//! Axum surface: JSON API, progress WebSocket and the origin guard.

mod constants;
mod handlers;
mod origin;
mod router;
mod ws;

use std::sync::Arc;

use grabber_engine::EngineHandle;

use super::config::ServerConfig;
use super::effects::QueueHandle;

pub use router::build_router;

/// Shared by every handler; clones are cheap.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub queue: QueueHandle,
    pub config: Arc<ServerConfig>,
}
