//! Queue runner: owns the queue state and turns effects into async work.
//!
//! All `update` calls happen on the runner task, so the dedup set and the
//! queue index are never touched concurrently. Resolve, transfer and delay
//! work runs on spawned tasks that answer with a `Msg` on the same inbox.

use std::time::Duration;

use grabber_core::{
    update, Effect, LogLevel, Msg, QueueState, QueueViewModel, ResolvedLink, TransferOutcome,
};
use grabber_engine::{EngineHandle, TransferId};
use grabber_logging::{grabber_debug, grabber_error, grabber_info, grabber_warn};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue runner is not running")]
pub struct RunnerGone;

/// What a caller learns from one dispatched message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub view: QueueViewModel,
    pub run_started: bool,
    pub confirmation_required: bool,
    pub run_aborted: bool,
}

struct Envelope {
    msg: Msg,
    reply: Option<oneshot::Sender<DispatchOutcome>>,
}

/// Cloneable front door to the runner task.
#[derive(Clone)]
pub struct QueueHandle {
    inbox: mpsc::UnboundedSender<Envelope>,
    view: watch::Receiver<QueueViewModel>,
}

impl QueueHandle {
    pub async fn submit(&self, raw_links: String) -> Result<DispatchOutcome, RunnerGone> {
        self.request(Msg::LinksSubmitted(raw_links)).await
    }

    pub async fn clear(&self, confirmed: bool) -> Result<DispatchOutcome, RunnerGone> {
        self.request(Msg::ClearRequested { confirmed }).await
    }

    pub async fn cancel_clear(&self) -> Result<DispatchOutcome, RunnerGone> {
        self.request(Msg::ClearCancelled).await
    }

    /// Latest published view; never waits on the runner.
    pub fn view(&self) -> QueueViewModel {
        self.view.borrow().clone()
    }

    async fn request(&self, msg: Msg) -> Result<DispatchOutcome, RunnerGone> {
        let (reply, answer) = oneshot::channel();
        self.inbox
            .send(Envelope {
                msg,
                reply: Some(reply),
            })
            .map_err(|_| RunnerGone)?;
        answer.await.map_err(|_| RunnerGone)
    }
}

pub struct QueueRunner {
    state: QueueState,
    engine: EngineHandle,
    inbox_tx: mpsc::UnboundedSender<Envelope>,
    view_tx: watch::Sender<QueueViewModel>,
    shutdown: CancellationToken,
    /// Cancels pending delays of the current run only.
    run_token: CancellationToken,
}

impl QueueRunner {
    /// Starts the runner task. It stops when `shutdown` is cancelled.
    pub fn spawn(
        engine: EngineHandle,
        advance_delay: Duration,
        shutdown: CancellationToken,
    ) -> (QueueHandle, JoinHandle<()>) {
        let state = QueueState::with_advance_delay(advance_delay);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(state.view());
        let run_token = shutdown.child_token();
        let runner = Self {
            state,
            engine,
            inbox_tx: inbox_tx.clone(),
            view_tx,
            shutdown,
            run_token,
        };
        let task = tokio::spawn(runner.run(inbox_rx));
        (
            QueueHandle {
                inbox: inbox_tx,
                view: view_rx,
            },
            task,
        )
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
        grabber_debug!("queue runner started");
        loop {
            let envelope = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                next = inbox.recv() => match next {
                    Some(envelope) => envelope,
                    None => break,
                },
            };
            let outcome = self.dispatch(envelope.msg);
            if let Some(reply) = envelope.reply {
                let _ = reply.send(outcome);
            }
        }
        self.run_token.cancel();
        grabber_info!("queue runner stopped");
    }

    fn dispatch(&mut self, msg: Msg) -> DispatchOutcome {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        let mut outcome = DispatchOutcome::default();
        for effect in effects {
            self.perform(effect, &mut outcome);
        }

        outcome.view = self.state.view();
        if self.state.consume_dirty() {
            self.view_tx.send_replace(outcome.view.clone());
        }
        outcome
    }

    fn perform(&mut self, effect: Effect, outcome: &mut DispatchOutcome) {
        match effect {
            Effect::RunStarted { run_id, total } => {
                grabber_info!("queue run {run_id} started with {total} links");
                self.run_token = self.shutdown.child_token();
                outcome.run_started = true;
            }
            Effect::Resolve {
                run_id,
                index,
                link,
            } => {
                let engine = self.engine.clone();
                let inbox = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = engine
                        .resolve(&link)
                        .await
                        .map(|target| ResolvedLink {
                            display_name: target.display_name,
                            direct_url: target.direct_url,
                            transfer_id: target.transfer_id.to_string(),
                        })
                        .map_err(|err| err.to_string());
                    post(&inbox, Msg::Resolved {
                        run_id,
                        index,
                        result,
                    });
                });
            }
            Effect::StartTransfer {
                run_id,
                index,
                target,
            } => {
                let engine = self.engine.clone();
                let inbox = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let transfer_id = TransferId::new(target.transfer_id);
                    let outcome = match engine
                        .fetch(&transfer_id, &target.direct_url, &target.display_name)
                        .await
                    {
                        Ok(_) => TransferOutcome::Success,
                        Err(_) => TransferOutcome::Failed,
                    };
                    post(&inbox, Msg::TransferFinished {
                        run_id,
                        index,
                        outcome,
                    });
                });
            }
            Effect::ScheduleAdvance {
                run_id,
                index,
                delay,
            } => {
                let inbox = self.inbox_tx.clone();
                let token = self.run_token.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {
                            grabber_debug!("advance after index {index} of run {run_id} cancelled");
                        }
                        _ = tokio::time::sleep(delay) => {
                            post(&inbox, Msg::DelayElapsed { run_id, index });
                        }
                    }
                });
            }
            Effect::ConfirmationRequired => {
                outcome.confirmation_required = true;
            }
            Effect::RunAborted { run_id } => {
                grabber_warn!("queue run {run_id} aborted");
                self.run_token.cancel();
                outcome.run_aborted = true;
            }
            Effect::RunFinished {
                run_id,
                completed,
                total,
            } => {
                grabber_info!("queue run {run_id} finished: {completed}/{total}");
            }
            Effect::Log { level, message } => match level {
                LogLevel::Info => grabber_info!("{message}"),
                LogLevel::Warn => grabber_warn!("{message}"),
                LogLevel::Error => grabber_error!("{message}"),
            },
        }
    }
}

fn post(inbox: &mpsc::UnboundedSender<Envelope>, msg: Msg) {
    if inbox.send(Envelope { msg, reply: None }).is_err() {
        grabber_debug!("queue runner gone; dropping message");
    }
}
