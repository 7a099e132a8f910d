use crate::state::{parse_links, StepPhase};
use crate::{Effect, LogLevel, Msg, QueueState, SessionState, TransferOutcome};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: QueueState, msg: Msg) -> (QueueState, Vec<Effect>) {
    let effects = match msg {
        Msg::LinksSubmitted(raw) => {
            let links = parse_links(&raw);
            if links.is_empty() || state.session() == SessionState::Running {
                return (state, Vec::new());
            }

            let total = links.len();
            let run_id = state.start_run(links);
            let mut effects = vec![
                Effect::RunStarted { run_id, total },
                log(LogLevel::Info, format!("Processing {total} links")),
            ];
            if state.is_waiting_for_transfer() {
                effects.push(log(
                    LogLevel::Info,
                    "Waiting for the previous transfer to finish".to_string(),
                ));
            } else {
                effects.extend(resolve_current(&state));
            }
            effects
        }
        Msg::Resolved {
            run_id,
            index,
            result,
        } => {
            if !state.is_current(run_id, index, StepPhase::Resolving) {
                return (state, Vec::new());
            }
            match result {
                Err(message) => {
                    state.record_skipped();
                    let mut effects =
                        vec![log(LogLevel::Error, format!("Failed to process link: {message}"))];
                    effects.extend(advance(&mut state));
                    effects
                }
                Ok(target) => {
                    if !state.remember_url(&target.direct_url) {
                        state.record_skipped();
                        let mut effects = vec![log(
                            LogLevel::Warn,
                            format!("Skipping duplicate download: {}", target.display_name),
                        )];
                        effects.extend(advance(&mut state));
                        effects
                    } else {
                        state.begin_transfer();
                        vec![Effect::StartTransfer {
                            run_id,
                            index,
                            target,
                        }]
                    }
                }
            }
        }
        Msg::TransferFinished {
            run_id,
            index,
            outcome,
        } => {
            if !state.is_current(run_id, index, StepPhase::Transferring) {
                let left_over =
                    run_id != state.run_id() || state.session() == SessionState::Idle;
                if !left_over {
                    return (state, Vec::new());
                }
                // Transfer from an aborted run: unblock a run that waited for it.
                state.end_transfer();
                if state.session() == SessionState::Running && state.is_waiting_for_transfer() {
                    state.stop_waiting_for_transfer();
                    return resolve_after(state);
                }
                return (state, Vec::new());
            }
            state.end_transfer();
            state.begin_wait();
            if outcome == TransferOutcome::Success {
                state.record_completed();
            }
            vec![Effect::ScheduleAdvance {
                run_id,
                index,
                delay: state.advance_delay(),
            }]
        }
        Msg::DelayElapsed { run_id, index } => {
            if !state.is_current(run_id, index, StepPhase::Waiting) {
                return (state, Vec::new());
            }
            advance(&mut state)
        }
        Msg::ClearRequested { confirmed } => match state.session() {
            SessionState::Running if !confirmed => {
                state.request_confirmation();
                vec![Effect::ConfirmationRequired]
            }
            SessionState::Running => {
                let run_id = state.run_id();
                state.clear();
                vec![
                    Effect::RunAborted { run_id },
                    log(LogLevel::Warn, "Download queue cleared".to_string()),
                ]
            }
            SessionState::Idle => {
                state.clear();
                vec![log(LogLevel::Warn, "Download queue cleared".to_string())]
            }
        },
        Msg::ClearCancelled => {
            state.cancel_confirmation();
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn resolve_after(state: QueueState) -> (QueueState, Vec<Effect>) {
    let effects = resolve_current(&state);
    (state, effects)
}

fn resolve_current(state: &QueueState) -> Vec<Effect> {
    match state.current_link() {
        Some(link) => vec![Effect::Resolve {
            run_id: state.run_id(),
            index: state.index(),
            link: link.to_string(),
        }],
        None => Vec::new(),
    }
}

/// Steps to the next link, or finishes the run when none is left.
fn advance(state: &mut QueueState) -> Vec<Effect> {
    if state.advance() {
        return resolve_current(state);
    }
    let run_id = state.run_id();
    let completed = state.completed();
    let total = state.links().len();
    state.finish_run();
    vec![
        Effect::RunFinished {
            run_id,
            completed,
            total,
        },
        log(
            LogLevel::Info,
            format!("All downloads completed: {completed}/{total} files processed"),
        ),
    ]
}

fn log(level: LogLevel, message: String) -> Effect {
    Effect::Log { level, message }
}
