use crate::execution::batch::BatchPosition;
use crate::runtime::hooks::{done, BatchHooks, HookFuture};
use crate::state::snapshot::Snapshot;
use anyhow::Error as AnyError;
use std::fmt;

/// One-line, human-readable rendering of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub processed: u64,
    pub failed: u64,
    pub position: Option<BatchPosition>,
    pub page: Option<(u64, u64)>,
    pub elapsed_secs: Option<i64>,
}

impl ProgressReport {
    pub fn from_snapshot(state: &Snapshot) -> Self {
        let page = match (state.current_page, state.total_pages) {
            (Some(current), Some(total)) => Some((current, total)),
            _ => None,
        };
        let elapsed_secs = match (state.started_at, state.last_updated) {
            (Some(started), Some(updated)) => Some((updated - started).num_seconds().max(0)),
            _ => None,
        };

        Self {
            processed: state.total_processed,
            failed: state.total_failed,
            position: None,
            page,
            elapsed_secs,
        }
    }

    pub fn at(mut self, position: BatchPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Share of settled items that succeeded, in percent.
    pub fn success_rate(&self) -> Option<f64> {
        let settled = self.processed.saturating_add(self.failed);
        if settled == 0 {
            return None;
        }
        Some(self.processed as f64 * 100.0 / settled as f64)
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.position, self.page) {
            (Some(position), _) => write!(f, "batch {}/{}", position.number, position.total)?,
            (None, Some((current, total))) => {
                // The cursor points at the next page once a page completes.
                let shown = current.min(total);
                write!(f, "page {shown}/{total}")?
            }
            (None, None) => f.write_str("progress")?,
        }

        write!(f, " | {} processed | {} failed", self.processed, self.failed)?;

        if let Some(rate) = self.success_rate() {
            write!(f, " | {rate:.1}% ok")?;
        }

        if let Some(elapsed) = self.elapsed_secs {
            write!(f, " | {elapsed}s elapsed")?;
        }

        Ok(())
    }
}

/// Hooks that log a [`ProgressReport`] at every batch and page boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHooks;

impl<T, R> BatchHooks<T, R> for LoggingHooks {
    fn on_batch_start<'a>(
        &'a mut self,
        position: BatchPosition,
        batch: &'a [T],
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        tracing::debug!(
            target: "batchwise::progress",
            batch = position.number,
            total_batches = position.total,
            items = batch.len(),
            "batch started"
        );
        done()
    }

    fn on_batch_complete<'a>(
        &'a mut self,
        position: BatchPosition,
        _batch: &'a [T],
        _total_processed: u64,
        _total_failed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        let report = ProgressReport::from_snapshot(state).at(position);
        tracing::info!(target: "batchwise::progress", "{report}");
        done()
    }

    fn on_page_complete<'a>(
        &'a mut self,
        page: u64,
        _total_pages: u64,
        page_processed: u64,
        _total_processed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        let report = ProgressReport::from_snapshot(state);
        tracing::info!(target: "batchwise::progress", page, page_processed, "{report}");
        done()
    }

    fn on_item_error<'a>(
        &'a mut self,
        _item: &'a T,
        error: &'a AnyError,
        total_failed: u64,
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        tracing::warn!(
            target: "batchwise::progress",
            total_failed,
            error = %error,
            "item failed"
        );
        done()
    }
}
