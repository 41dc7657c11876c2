use super::result::BatchResult;
use super::window::{emit_state_update, run_window, Window};
use crate::execution::batch::BatchPlan;
use crate::runtime::clock::{Clock, SystemClock};
use crate::runtime::config::BatchConfig;
use crate::runtime::error::{RunError, RunStage, StageContext};
use crate::runtime::hooks::BatchHooks;
use crate::runtime::progress::ProgressTracker;
use crate::runtime::telemetry::Telemetry;
use crate::state::snapshot::Snapshot;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;

/// Runs a fixed collection in sequential batches, each under a bounded
/// concurrency window.
pub struct ArrayBatchExecutor {
    clock: Arc<dyn Clock>,
    telemetry: Arc<Telemetry>,
}

impl Default for ArrayBatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayBatchExecutor {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Uses `clock` for every snapshot timestamp.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            telemetry: Arc::new(Telemetry::default()),
        }
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Returns a clone of the telemetry handle for observability.
    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Processes `items` batch by batch.
    ///
    /// `process` receives the item, its 0-based index within the batch and the
    /// snapshot current when the item was admitted. An `Err` from `process` is
    /// counted and reported through `on_item_error`; it never aborts the run.
    /// Hook errors do, and are returned with the stage they came from.
    #[tracing::instrument(name = "batch_run", skip_all, fields(items = items.len()))]
    pub async fn run<T, R, P, PFut, H>(
        &self,
        items: &[T],
        process: P,
        config: &BatchConfig,
        mut hooks: H,
    ) -> Result<BatchResult, RunError>
    where
        T: Clone,
        P: Fn(T, usize, Arc<Snapshot>) -> PFut,
        PFut: Future<Output = Result<R>>,
        H: BatchHooks<T, R>,
    {
        let plan = BatchPlan::new(items.len(), config.batch_size());
        let total_batches = plan.total_batches();

        if total_batches == 0 {
            tracing::debug!(target: "batchwise::processor", "no items to process");
            return Ok(BatchResult::from_state(config.initial_state().clone()));
        }

        let mut progress = ProgressTracker::new(config.initial_state().clone(), self.clock.clone());

        tracing::info!(
            target: "batchwise::processor",
            total_batches,
            batch_size = plan.batch_size(),
            concurrency_limit = config.concurrency_limit(),
            seeded_processed = progress.total_processed(),
            seeded_failed = progress.total_failed(),
            "starting batch run"
        );

        for (position, batch) in plan.batches(items) {
            hooks
                .on_batch_start(position, batch, progress.snapshot())
                .await
                .at_stage(RunStage::BatchStart)?;

            let outcome = run_window(
                Window {
                    items: batch,
                    concurrency_limit: config.concurrency_limit(),
                    state_update_interval: config.state_update_interval(),
                    position: Some(position),
                },
                &process,
                &mut hooks,
                &mut progress,
                &self.telemetry,
            )
            .await?;

            progress.refresh();
            emit_state_update::<T, R, H>(&mut hooks, &progress, Some(position), &self.telemetry)
                .await?;
            self.telemetry.record_batch_completed();

            tracing::debug!(
                target: "batchwise::processor",
                batch = position.number,
                total_batches,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "batch settled"
            );

            hooks
                .on_batch_complete(
                    position,
                    batch,
                    progress.total_processed(),
                    progress.total_failed(),
                    progress.snapshot(),
                )
                .await
                .at_stage(RunStage::BatchComplete)?;
        }

        let result = BatchResult {
            processed: progress.total_processed(),
            failed: progress.total_failed(),
            state: progress.into_snapshot(),
        };

        tracing::info!(
            target: "batchwise::processor",
            processed = result.processed,
            failed = result.failed,
            "batch run finished"
        );

        Ok(result)
    }
}
