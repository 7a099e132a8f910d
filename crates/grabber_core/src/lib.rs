//! Grabber core: pure queue state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, LogLevel};
pub use msg::Msg;
pub use state::{
    parse_links, QueueState, ResolvedLink, RunId, SessionState, StepPhase, TransferOutcome,
    DEFAULT_ADVANCE_DELAY,
};
pub use update::update;
pub use view_model::QueueViewModel;
