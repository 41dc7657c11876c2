use crate::runtime::clock::Clock;
use crate::state::snapshot::Snapshot;
use std::sync::Arc;

/// Running completion counters plus the snapshot currently exposed to hooks.
///
/// Counters move on every completion; the snapshot only changes when
/// [`ProgressTracker::refresh`] replaces it, so readers always see a fully
/// formed value.
pub struct ProgressTracker {
    total_processed: u64,
    total_failed: u64,
    snapshot: Arc<Snapshot>,
    clock: Arc<dyn Clock>,
}

impl ProgressTracker {
    pub fn new(seed: Snapshot, clock: Arc<dyn Clock>) -> Self {
        Self {
            total_processed: seed.total_processed,
            total_failed: seed.total_failed,
            snapshot: Arc::new(seed),
            clock,
        }
    }

    pub fn record_success(&mut self) -> u64 {
        self.total_processed = self.total_processed.saturating_add(1);
        self.total_processed
    }

    pub fn record_failure(&mut self) -> u64 {
        self.total_failed = self.total_failed.saturating_add(1);
        self.total_failed
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Handle to the current snapshot that stays valid after later refreshes.
    pub fn shared_snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Replaces the snapshot with one carrying the current counters and a fresh timestamp.
    pub fn refresh(&mut self) {
        self.refresh_with(|_| {});
    }

    /// Like [`ProgressTracker::refresh`], applying `update` to the new snapshot first.
    /// Counters and timestamps always win over whatever `update` writes to them.
    pub fn refresh_with(&mut self, update: impl FnOnce(&mut Snapshot)) {
        let now = self.clock.now();
        let mut next = Snapshot::clone(&self.snapshot);
        update(&mut next);
        next.total_processed = self.total_processed;
        next.total_failed = self.total_failed;
        next.last_updated = Some(now);
        next.started_at.get_or_insert(now);
        self.snapshot = Arc::new(next);
    }

    pub fn into_snapshot(self) -> Snapshot {
        Arc::try_unwrap(self.snapshot).unwrap_or_else(|shared| Snapshot::clone(&shared))
    }
}
