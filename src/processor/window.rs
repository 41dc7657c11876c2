//! Per-item execution shared by the array executor and the paginated driver.
//!
//! A window is one batch or one page. Its items go through a
//! [`ConcurrencyGate`]; completions are handled one at a time on the caller's
//! task, so counter updates and snapshot replacement never interleave.

use crate::execution::batch::BatchPosition;
use crate::execution::gate::ConcurrencyGate;
use crate::runtime::error::{RunError, RunStage, StageContext};
use crate::runtime::hooks::BatchHooks;
use crate::runtime::progress::ProgressTracker;
use crate::runtime::telemetry::Telemetry;
use crate::state::snapshot::Snapshot;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;

pub(crate) struct Window<'a, T> {
    pub items: &'a [T],
    pub concurrency_limit: usize,
    pub state_update_interval: u64,
    pub position: Option<BatchPosition>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowOutcome {
    pub succeeded: u64,
    pub failed: u64,
}

/// Runs every item of `window` and returns once all of them have settled.
///
/// Each item sees the snapshot current at its admission. Mid-window snapshots
/// are emitted when the window's success count hits a multiple of the update
/// interval or the window length.
pub(crate) async fn run_window<T, R, P, PFut, H>(
    window: Window<'_, T>,
    process: &P,
    hooks: &mut H,
    progress: &mut ProgressTracker,
    telemetry: &Telemetry,
) -> Result<WindowOutcome, RunError>
where
    T: Clone,
    P: Fn(T, usize, Arc<Snapshot>) -> PFut,
    PFut: Future<Output = Result<R>>,
    H: BatchHooks<T, R>,
{
    let Window {
        items,
        concurrency_limit,
        state_update_interval,
        position,
    } = window;
    let window_len = items.len() as u64;
    let interval = state_update_interval.max(1);
    let mut outcome = WindowOutcome::default();

    let mut gate = ConcurrencyGate::new(concurrency_limit);
    gate.extend(items.iter().cloned().enumerate());

    loop {
        let snapshot = progress.shared_snapshot();
        let settled = gate
            .next_settled(|(index, item): (usize, T)| {
                let pending = process(item.clone(), index, Arc::clone(&snapshot));
                async move { (item, pending.await) }
            })
            .await;
        let Some((item, result)) = settled else {
            break;
        };

        match result {
            Ok(value) => {
                let total_processed = progress.record_success();
                outcome.succeeded += 1;
                telemetry.record_item_success();

                hooks
                    .on_item_success(&item, &value, total_processed, progress.snapshot())
                    .await
                    .at_stage(RunStage::ItemSuccess)?;

                if outcome.succeeded % interval == 0 || outcome.succeeded == window_len {
                    progress.refresh();
                    emit_state_update::<T, R, H>(hooks, progress, position, telemetry).await?;
                }
            }
            Err(error) => {
                let total_failed = progress.record_failure();
                outcome.failed += 1;
                telemetry.record_item_failure();
                tracing::debug!(
                    target: "batchwise::processor",
                    batch = position.map(|position| position.number),
                    total_failed,
                    error = %error,
                    "item failed"
                );

                hooks
                    .on_item_error(&item, &error, total_failed, progress.snapshot())
                    .await
                    .at_stage(RunStage::ItemError)?;
            }
        }
    }

    Ok(outcome)
}

/// Hands the current snapshot to `on_state_update`.
pub(crate) async fn emit_state_update<T, R, H>(
    hooks: &mut H,
    progress: &ProgressTracker,
    position: Option<BatchPosition>,
    telemetry: &Telemetry,
) -> Result<(), RunError>
where
    H: BatchHooks<T, R>,
{
    telemetry.record_state_update();
    hooks
        .on_state_update(progress.snapshot(), position)
        .await
        .at_stage(RunStage::StateUpdate)
}
