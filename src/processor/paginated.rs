use super::page::PageData;
use super::result::BatchResult;
use super::window::{emit_state_update, run_window, Window};
use crate::runtime::clock::{Clock, SystemClock};
use crate::runtime::config::BatchConfig;
use crate::runtime::error::{RunError, RunStage, StageContext};
use crate::runtime::hooks::BatchHooks;
use crate::runtime::progress::ProgressTracker;
use crate::runtime::telemetry::Telemetry;
use crate::state::snapshot::Snapshot;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;

/// Drives a paginated source page by page until the cursor passes the page
/// count reported by the source.
///
/// The page count is only known once a response carries it, so the loop
/// condition is re-checked after every page. Until then a single page is
/// assumed.
pub struct PaginatedBatchDriver {
    clock: Arc<dyn Clock>,
    telemetry: Arc<Telemetry>,
}

impl Default for PaginatedBatchDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginatedBatchDriver {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            telemetry: Arc::new(Telemetry::default()),
        }
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Fetches and processes pages starting at the seeded cursor.
    ///
    /// A `fetch_page` error is fatal and returned as [`RunStage::FetchPage`];
    /// the last emitted snapshot then points at the page to retry.
    #[tracing::instrument(name = "paginated_run", skip_all)]
    pub async fn run<T, R, F, FFut, P, PFut, H>(
        &self,
        mut fetch_page: F,
        process: P,
        config: &BatchConfig,
        mut hooks: H,
    ) -> Result<BatchResult, RunError>
    where
        T: Clone,
        F: FnMut(u64, Arc<Snapshot>) -> FFut,
        FFut: Future<Output = Result<PageData<T>>>,
        P: Fn(T, usize, Arc<Snapshot>) -> PFut,
        PFut: Future<Output = Result<R>>,
        H: BatchHooks<T, R>,
    {
        let mut seed = config.initial_state().clone();
        let mut current_page = seed.current_page.unwrap_or(config.initial_page());
        let mut total_pages = seed.total_pages.unwrap_or(1);
        seed.current_page = Some(current_page);
        seed.total_pages = Some(total_pages);
        let mut progress = ProgressTracker::new(seed, self.clock.clone());

        tracing::info!(
            target: "batchwise::processor",
            start_page = current_page,
            known_total_pages = total_pages,
            concurrency_limit = config.concurrency_limit(),
            seeded_processed = progress.total_processed(),
            seeded_failed = progress.total_failed(),
            "starting paginated run"
        );

        while current_page <= total_pages {
            hooks
                .on_page_start(current_page, total_pages, progress.snapshot())
                .await
                .at_stage(RunStage::PageStart)?;

            let page = match fetch_page(current_page, progress.shared_snapshot())
                .await
                .with_context(|| format!("failed to fetch page {current_page}"))
            {
                Ok(page) => page,
                Err(err) => {
                    tracing::error!(
                        target: "batchwise::processor",
                        page = current_page,
                        error = %err,
                        "page fetch failed; aborting run"
                    );
                    return Err(RunError::new(RunStage::FetchPage, err));
                }
            };

            if let Some(reported) = page.total_pages() {
                if reported != total_pages {
                    tracing::debug!(
                        target: "batchwise::processor",
                        previous = total_pages,
                        reported,
                        "page count updated"
                    );
                    total_pages = reported;
                    progress.refresh_with(|next| next.total_pages = Some(reported));
                    emit_state_update::<T, R, H>(&mut hooks, &progress, None, &self.telemetry)
                        .await?;
                }
            }

            let items = page.into_items();
            self.telemetry.record_page_fetched(items.is_empty());

            if items.is_empty() {
                tracing::debug!(
                    target: "batchwise::processor",
                    page = current_page,
                    total_pages,
                    "empty page; advancing cursor"
                );
                current_page += 1;
                progress.refresh_with(|next| next.current_page = Some(current_page));
                emit_state_update::<T, R, H>(&mut hooks, &progress, None, &self.telemetry).await?;
                continue;
            }

            let outcome = run_window(
                Window {
                    items: &items,
                    concurrency_limit: config.concurrency_limit(),
                    state_update_interval: config.state_update_interval(),
                    position: None,
                },
                &process,
                &mut hooks,
                &mut progress,
                &self.telemetry,
            )
            .await?;

            let completed_page = current_page;
            current_page += 1;
            progress.refresh_with(|next| next.current_page = Some(current_page));
            emit_state_update::<T, R, H>(&mut hooks, &progress, None, &self.telemetry).await?;

            tracing::debug!(
                target: "batchwise::processor",
                page = completed_page,
                total_pages,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "page settled"
            );

            hooks
                .on_page_complete(
                    completed_page,
                    total_pages,
                    outcome.succeeded,
                    progress.total_processed(),
                    progress.snapshot(),
                )
                .await
                .at_stage(RunStage::PageComplete)?;
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
            total_pages,
            "paginated run finished"
        );

        Ok(result)
    }
}
