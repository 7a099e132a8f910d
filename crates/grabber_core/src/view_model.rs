use crate::{RunId, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueViewModel {
    pub session: SessionState,
    pub run_id: RunId,
    pub total: usize,
    pub current_index: Option<usize>,
    pub current_link: Option<String>,
    pub completed: usize,
    pub skipped: usize,
    /// Links not yet finished, the current one first.
    pub remaining: Vec<String>,
    pub awaiting_confirmation: bool,
    pub transfer_in_flight: bool,
    pub dirty: bool,
}

impl QueueViewModel {
    /// `completed/total` counter as shown next to the queue.
    pub fn progress_label(&self) -> String {
        if self.total == 0 {
            String::new()
        } else {
            format!("{}/{}", self.completed, self.total)
        }
    }
}
