use crate::state::snapshot::Snapshot;

/// Terminal record of a run that consumed its whole input.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub processed: u64,
    pub failed: u64,
    pub state: Snapshot,
}

impl BatchResult {
    /// Result whose counters are read straight from `state`.
    pub fn from_state(state: Snapshot) -> Self {
        Self {
            processed: state.total_processed,
            failed: state.total_failed,
            state,
        }
    }

    pub fn total_settled(&self) -> u64 {
        self.processed.saturating_add(self.failed)
    }
}
