use std::collections::BTreeSet;
use std::time::Duration;

use crate::view_model::QueueViewModel;

pub type RunId = u64;

/// Pause between two queue entries once a transfer has finished.
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
}

/// Resolver output as the queue sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub display_name: String,
    pub direct_url: String,
    pub transfer_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    Failed,
}

/// Which answer the current queue entry is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepPhase {
    #[default]
    Resolving,
    Transferring,
    Waiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueState {
    links: Vec<String>,
    session: SessionState,
    run_id: RunId,
    index: usize,
    phase: StepPhase,
    completed: usize,
    skipped: usize,
    seen_urls: BTreeSet<String>,
    transfer_in_flight: bool,
    waiting_for_transfer: bool,
    awaiting_confirmation: bool,
    advance_delay: Duration,
    dirty: bool,
}

impl Default for QueueState {
    fn default() -> Self {
        Self::with_advance_delay(DEFAULT_ADVANCE_DELAY)
    }
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_advance_delay(advance_delay: Duration) -> Self {
        Self {
            links: Vec::new(),
            session: SessionState::Idle,
            run_id: 0,
            index: 0,
            phase: StepPhase::Resolving,
            completed: 0,
            skipped: 0,
            seen_urls: BTreeSet::new(),
            transfer_in_flight: false,
            waiting_for_transfer: false,
            awaiting_confirmation: false,
            advance_delay,
            dirty: false,
        }
    }

    pub fn view(&self) -> QueueViewModel {
        let running = self.session == SessionState::Running;
        QueueViewModel {
            session: self.session,
            run_id: self.run_id,
            total: self.links.len(),
            current_index: running.then_some(self.index),
            current_link: if running {
                self.links.get(self.index).cloned()
            } else {
                None
            },
            completed: self.completed,
            skipped: self.skipped,
            remaining: self.links.iter().skip(self.index).cloned().collect(),
            awaiting_confirmation: self.awaiting_confirmation,
            transfer_in_flight: self.transfer_in_flight,
            dirty: self.dirty,
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn advance_delay(&self) -> Duration {
        self.advance_delay
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// True when `run_id`/`index` address the step the running session is on
    /// and that step is in `phase`.
    pub(crate) fn is_current(&self, run_id: RunId, index: usize, phase: StepPhase) -> bool {
        self.session == SessionState::Running
            && self.run_id == run_id
            && self.index == index
            && self.phase == phase
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub(crate) fn begin_wait(&mut self) {
        self.phase = StepPhase::Waiting;
    }

    pub(crate) fn links(&self) -> &[String] {
        &self.links
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed
    }

    pub(crate) fn current_link(&self) -> Option<&str> {
        self.links.get(self.index).map(String::as_str)
    }

    /// Starts a new run over `links`; the dedup set only lives for one run.
    pub(crate) fn start_run(&mut self, links: Vec<String>) -> RunId {
        self.run_id += 1;
        self.links = links;
        self.session = SessionState::Running;
        self.index = 0;
        self.phase = StepPhase::Resolving;
        self.completed = 0;
        self.skipped = 0;
        self.seen_urls.clear();
        self.awaiting_confirmation = false;
        self.waiting_for_transfer = self.transfer_in_flight;
        self.mark_dirty();
        self.run_id
    }

    pub(crate) fn is_waiting_for_transfer(&self) -> bool {
        self.waiting_for_transfer
    }

    pub(crate) fn stop_waiting_for_transfer(&mut self) {
        self.waiting_for_transfer = false;
    }

    /// Records `url` for this run. Returns false when it was already seen.
    pub(crate) fn remember_url(&mut self, url: &str) -> bool {
        self.seen_urls.insert(url.to_string())
    }

    pub(crate) fn begin_transfer(&mut self) {
        self.transfer_in_flight = true;
        self.phase = StepPhase::Transferring;
        self.mark_dirty();
    }

    pub(crate) fn end_transfer(&mut self) {
        self.transfer_in_flight = false;
        self.mark_dirty();
    }

    pub(crate) fn record_completed(&mut self) {
        self.completed += 1;
        self.mark_dirty();
    }

    pub(crate) fn record_skipped(&mut self) {
        self.skipped += 1;
        self.mark_dirty();
    }

    /// Moves to the next entry. Returns false once the list is exhausted.
    pub(crate) fn advance(&mut self) -> bool {
        self.index += 1;
        self.phase = StepPhase::Resolving;
        self.mark_dirty();
        self.index < self.links.len()
    }

    pub(crate) fn finish_run(&mut self) {
        self.session = SessionState::Idle;
        self.awaiting_confirmation = false;
        self.waiting_for_transfer = false;
        self.mark_dirty();
    }

    pub(crate) fn request_confirmation(&mut self) {
        self.awaiting_confirmation = true;
        self.mark_dirty();
    }

    pub(crate) fn cancel_confirmation(&mut self) -> bool {
        let was_waiting = std::mem::take(&mut self.awaiting_confirmation);
        if was_waiting {
            self.mark_dirty();
        }
        was_waiting
    }

    /// Drops every link and returns to idle. A transfer already in flight is
    /// still tracked so the next run cannot overlap it.
    pub(crate) fn clear(&mut self) {
        self.links.clear();
        self.index = 0;
        self.phase = StepPhase::Resolving;
        self.completed = 0;
        self.skipped = 0;
        self.finish_run();
    }
}

/// Splits pasted text into links: one per line, trimmed, blanks dropped.
pub fn parse_links(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
