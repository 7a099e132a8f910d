use std::time::Duration;

use crate::{ResolvedLink, RunId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RunStarted {
        run_id: RunId,
        total: usize,
    },
    /// Resolve the link at `index` and answer with `Msg::Resolved`.
    Resolve {
        run_id: RunId,
        index: usize,
        link: String,
    },
    /// Transfer the resolved target and answer with `Msg::TransferFinished`.
    StartTransfer {
        run_id: RunId,
        index: usize,
        target: ResolvedLink,
    },
    /// Wait `delay`, then answer with `Msg::DelayElapsed`.
    ScheduleAdvance {
        run_id: RunId,
        index: usize,
        delay: Duration,
    },
    /// A clear was requested during a run and needs explicit confirmation.
    ConfirmationRequired,
    RunAborted {
        run_id: RunId,
    },
    RunFinished {
        run_id: RunId,
        completed: usize,
        total: usize,
    },
    Log {
        level: LogLevel,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}
