//! HTTP and WebSocket front end for the grabber engine and queue.
pub mod platform;

pub use platform::app::{build_state, run, serve};
pub use platform::config::{ConfigError, ServerConfig};
pub use platform::effects::{DispatchOutcome, QueueHandle, QueueRunner, RunnerGone};
pub use platform::http::{build_router, AppState};
