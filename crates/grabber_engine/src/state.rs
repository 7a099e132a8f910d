use std::path::PathBuf;

use crate::TransferId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    InProgress,
    Complete,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }

    fn can_move_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Pending, Phase::InProgress)
                | (Phase::Pending, Phase::Failed)
                | (Phase::InProgress, Phase::Complete)
                | (Phase::InProgress, Phase::Failed)
        )
    }
}

/// Bookkeeping for the single in-flight transfer.
///
/// Byte counts only grow and the phase only moves forward; illegal moves are
/// refused and leave the state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    transfer_id: TransferId,
    destination: PathBuf,
    bytes_expected: Option<u64>,
    bytes_transferred: u64,
    phase: Phase,
}

impl TransferState {
    pub fn new(transfer_id: TransferId, destination: PathBuf) -> Self {
        Self {
            transfer_id,
            destination,
            bytes_expected: None,
            bytes_transferred: 0,
            phase: Phase::Pending,
        }
    }

    pub fn transfer_id(&self) -> &TransferId {
        &self.transfer_id
    }

    pub fn destination(&self) -> &PathBuf {
        &self.destination
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bytes_expected(&self) -> Option<u64> {
        self.bytes_expected
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Moves `Pending -> InProgress` with the declared size, if any.
    pub fn begin(&mut self, bytes_expected: Option<u64>) -> bool {
        if !self.transition(Phase::InProgress) {
            return false;
        }
        self.bytes_expected = bytes_expected;
        true
    }

    /// Adds a received chunk. Ignored outside `InProgress`.
    pub fn record_chunk(&mut self, len: u64) -> bool {
        if self.phase != Phase::InProgress {
            return false;
        }
        self.bytes_transferred = self.bytes_transferred.saturating_add(len);
        true
    }

    pub fn complete(&mut self) -> bool {
        self.transition(Phase::Complete)
    }

    pub fn fail(&mut self) -> bool {
        self.transition(Phase::Failed)
    }

    /// `floor(transferred / expected * 100)`, capped at 100. `None` when the
    /// size is unknown or zero.
    pub fn percent(&self) -> Option<u8> {
        percent_of(self.bytes_transferred, self.bytes_expected?)
    }

    fn transition(&mut self, next: Phase) -> bool {
        if !self.phase.can_move_to(next) {
            return false;
        }
        self.phase = next;
        true
    }
}

pub(crate) fn percent_of(transferred: u64, expected: u64) -> Option<u8> {
    if expected == 0 {
        return None;
    }
    let pct = (u128::from(transferred) * 100) / u128::from(expected);
    Some(pct.min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> TransferState {
        TransferState::new(TransferId::new("1"), PathBuf::from("downloads/a.bin"))
    }

    #[test]
    fn phases_move_forward_only() {
        let mut s = state();
        assert!(!s.complete());
        assert!(s.begin(Some(10)));
        assert!(!s.begin(Some(10)));
        assert!(s.complete());
        assert!(!s.fail());
        assert_eq!(s.phase(), Phase::Complete);
        assert!(s.phase().is_terminal());
    }

    #[test]
    fn pending_may_fail_directly() {
        let mut s = state();
        assert!(s.fail());
        assert!(!s.begin(None));
        assert_eq!(s.phase(), Phase::Failed);
    }

    #[test]
    fn chunks_only_count_while_in_progress() {
        let mut s = state();
        assert!(!s.record_chunk(5));
        s.begin(Some(10));
        s.record_chunk(4);
        s.record_chunk(6);
        assert_eq!(s.bytes_transferred(), 10);
        assert_eq!(s.percent(), Some(100));
        s.complete();
        assert!(!s.record_chunk(1));
        assert_eq!(s.bytes_transferred(), 10);
    }

    #[test]
    fn percent_floors_and_caps() {
        assert_eq!(percent_of(1, 3), Some(33));
        assert_eq!(percent_of(999, 1000), Some(99));
        assert_eq!(percent_of(1500, 1000), Some(100));
        assert_eq!(percent_of(5, 0), None);
    }

    #[test]
    fn unknown_size_is_indeterminate() {
        let mut s = state();
        s.begin(None);
        s.record_chunk(42);
        assert_eq!(s.percent(), None);
    }
}
