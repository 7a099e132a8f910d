#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator submitted a block of links, one per line.
    LinksSubmitted(String),
    /// Resolver answer for the link at `index`; the error is a display message.
    Resolved {
        run_id: crate::RunId,
        index: usize,
        result: Result<crate::ResolvedLink, String>,
    },
    /// Return value of the transfer started for `index`.
    TransferFinished {
        run_id: crate::RunId,
        index: usize,
        outcome: crate::TransferOutcome,
    },
    /// The inter-transfer delay after `index` has passed.
    DelayElapsed { run_id: crate::RunId, index: usize },
    /// Operator asked to clear the queue.
    ClearRequested { confirmed: bool },
    /// Operator declined the clear confirmation.
    ClearCancelled,
    /// Fallback for placeholder wiring.
    NoOp,
}
