//! Array executor wired to a [`StateStore`] so an interrupted run picks up
//! where the last saved snapshot left off.

use super::array::ArrayBatchExecutor;
use super::result::BatchResult;
use crate::execution::batch::BatchPosition;
use crate::runtime::clock::Clock;
use crate::runtime::config::BatchConfig;
use crate::runtime::error::{RunError, RunStage, StageContext};
use crate::runtime::hooks::{BatchHooks, HookFuture};
use crate::state::snapshot::Snapshot;
use crate::state::store::StateStore;
use anyhow::{Context, Error as AnyError, Result};
use std::future::Future;
use std::sync::Arc;

pub struct ResumableProcessor<S> {
    store: S,
    executor: ArrayBatchExecutor,
    save_every: Option<u64>,
}

impl<S: StateStore> ResumableProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            executor: ArrayBatchExecutor::new(),
            save_every: None,
        }
    }

    pub fn with_executor(mut self, executor: ArrayBatchExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Also saves after every `successes` successful items, on top of the
    /// save at each snapshot replacement.
    pub fn save_every(mut self, successes: u64) -> Self {
        self.save_every = Some(successes.max(1));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn executor(&self) -> &ArrayBatchExecutor {
        &self.executor
    }

    /// Runs `items` seeded from the persisted snapshot, saving as it goes.
    ///
    /// When nothing is persisted the configured initial state is the seed.
    /// Otherwise the persisted snapshot wins, picking up any configured
    /// extension fields it does not carry yet.
    pub async fn process<T, R, P, PFut, H>(
        &self,
        items: &[T],
        process: P,
        config: &BatchConfig,
        hooks: H,
    ) -> Result<BatchResult, RunError>
    where
        T: Clone + Sync,
        R: Sync,
        P: Fn(T, usize, Arc<Snapshot>) -> PFut,
        PFut: Future<Output = Result<R>>,
        H: BatchHooks<T, R>,
    {
        let persisted = self
            .store
            .load()
            .await
            .context("failed to load persisted state")
            .at_stage(RunStage::LoadState)?;

        if !persisted.is_empty() {
            tracing::info!(
                target: "batchwise::resumable",
                processed = persisted.total_processed,
                failed = persisted.total_failed,
                "resuming from persisted state"
            );
        }

        let seed = seed_state(persisted, config.initial_state());
        let hooks = PersistingHooks {
            store: &self.store,
            inner: hooks,
            clock: self.executor.clock(),
            save_every: self.save_every,
            successes: 0,
            total_failed: seed.total_failed,
        };
        let config = config.with_initial_state(seed);

        self.executor.run(items, process, &config, hooks).await
    }

    /// Deletes the persisted snapshot.
    pub async fn clear_state(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Returns the persisted snapshot, empty when none is stored.
    pub async fn get_state(&self) -> Result<Snapshot> {
        self.store.load().await
    }
}

fn seed_state(persisted: Snapshot, configured: &Snapshot) -> Snapshot {
    if persisted.is_empty() {
        return configured.clone();
    }

    let mut seed = persisted;
    let persisted_fields = std::mem::replace(&mut seed.extensions, configured.extensions.clone());
    seed.merge_extensions(persisted_fields);
    seed
}

/// Saves on every snapshot replacement (and every n-th success), then
/// forwards to the caller's hooks.
///
/// The snapshot handed to item hooks lags the live counters until the next
/// refresh, so success-driven saves write the counters tracked here instead.
struct PersistingHooks<'s, S, H> {
    store: &'s S,
    inner: H,
    clock: Arc<dyn Clock>,
    save_every: Option<u64>,
    successes: u64,
    total_failed: u64,
}

impl<S, H, T, R> BatchHooks<T, R> for PersistingHooks<'_, S, H>
where
    S: StateStore,
    H: BatchHooks<T, R>,
    T: Sync,
    R: Sync,
{
    fn on_batch_start<'a>(
        &'a mut self,
        position: BatchPosition,
        batch: &'a [T],
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        self.inner.on_batch_start(position, batch, state)
    }

    fn on_batch_complete<'a>(
        &'a mut self,
        position: BatchPosition,
        batch: &'a [T],
        total_processed: u64,
        total_failed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        self.inner
            .on_batch_complete(position, batch, total_processed, total_failed, state)
    }

    fn on_item_success<'a>(
        &'a mut self,
        item: &'a T,
        result: &'a R,
        total_processed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        self.successes += 1;
        let checkpoint = self
            .save_every
            .is_some_and(|every| self.successes % every == 0)
            .then(|| {
                let now = self.clock.now();
                let mut checkpoint = state.clone();
                checkpoint.total_processed = total_processed;
                checkpoint.total_failed = self.total_failed;
                checkpoint.last_updated = Some(now);
                checkpoint.started_at.get_or_insert(now);
                checkpoint
            });

        Box::pin(async move {
            self.inner
                .on_item_success(item, result, total_processed, state)
                .await?;
            if let Some(checkpoint) = checkpoint {
                self.store
                    .save(&checkpoint)
                    .await
                    .context("failed to persist state after item success")?;
            }
            Ok(())
        })
    }

    fn on_item_error<'a>(
        &'a mut self,
        item: &'a T,
        error: &'a AnyError,
        total_failed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        self.total_failed = total_failed;
        self.inner.on_item_error(item, error, total_failed, state)
    }

    fn on_state_update<'a>(
        &'a mut self,
        state: &'a Snapshot,
        position: Option<BatchPosition>,
    ) -> HookFuture<'a> {
        Box::pin(async move {
            self.store
                .save(state)
                .await
                .context("failed to persist state")?;
            self.inner.on_state_update(state, position).await
        })
    }
}
