use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use crate::support::helpers::{
    double_unless_multiple, init_tracing, yield_times, ConcurrencyProbe, Event, RecordingHooks,
};
use anyhow::Result;
use batchwise::{
    ArrayBatchExecutor, BatchConfig, BatchHooks, BatchPosition, FixedClock, HookFuture,
    LoggingHooks, NoopHooks, RunStage, Snapshot, TelemetrySnapshot,
};
use chrono::{TimeZone, Utc};

fn config(batch_size: usize, concurrency_limit: usize) -> Result<BatchConfig> {
    BatchConfig::builder()
        .batch_size(batch_size)
        .concurrency_limit(concurrency_limit)
        .build()
}

#[tokio::test]
async fn default_config_processes_every_item() -> Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=45).collect();
    let mut hooks = RecordingHooks::default();

    let result = ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| double_unless_multiple(item, 0),
            &BatchConfig::default(),
            &mut hooks,
        )
        .await?;

    assert_eq!(result.processed, 45);
    assert_eq!(result.failed, 0);
    assert_eq!(hooks.batch_starts(), vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(result.state.total_processed, 45);
    Ok(())
}

#[tokio::test]
async fn five_items_in_batches_of_two() -> Result<()> {
    init_tracing();
    let items = [1u32, 2, 3, 4, 5];
    let mut hooks = RecordingHooks::default();

    let result = ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| async move { Ok(item) },
            &config(2, 1)?,
            &mut hooks,
        )
        .await?;

    assert_eq!((result.processed, result.failed), (5, 0));
    let batches: Vec<Vec<u32>> = hooks
        .events
        .iter()
        .filter_map(|event| match event {
            Event::BatchStart { items, .. } => Some(items.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
    assert_eq!(hooks.batch_starts(), vec![(1, 3), (2, 3), (3, 3)]);
    Ok(())
}

#[tokio::test]
async fn batches_never_overlap() -> Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=23).collect();
    let mut hooks = RecordingHooks::default();

    ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| double_unless_multiple(item, 4),
            &config(5, 3)?,
            &mut hooks,
        )
        .await?;

    let mut open: Option<(u64, Vec<u32>)> = None;
    let mut completed = 0;
    for event in &hooks.events {
        match event {
            Event::BatchStart { number, items, .. } => {
                assert!(open.is_none(), "batch {number} started before the previous one completed");
                assert_eq!(*number, completed + 1);
                open = Some((*number, items.clone()));
            }
            Event::BatchComplete { number, .. } => {
                let (current, _) = open.take().expect("completion without a start");
                assert_eq!(current, *number);
                completed = *number;
            }
            Event::ItemSuccess { item, .. } | Event::ItemError { item, .. } => {
                let (_, batch) = open.as_ref().expect("item settled outside a batch");
                assert!(batch.contains(item), "item {item} settled outside its batch");
            }
            _ => {}
        }
    }
    assert_eq!(completed, 5);
    Ok(())
}

#[tokio::test]
async fn in_flight_items_never_exceed_limit() -> Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=40).collect();
    let probe = ConcurrencyProbe::default();

    let result = ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| {
                let probe = probe.clone();
                async move {
                    probe.observe(yield_times(3)).await;
                    Ok(item)
                }
            },
            &config(20, 4)?,
            NoopHooks,
        )
        .await?;

    assert_eq!(result.processed, 40);
    assert_eq!(probe.total(), 40);
    assert_eq!(probe.peak(), 4);
    Ok(())
}

#[tokio::test]
async fn batch_size_caps_concurrency_above_it() -> Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=7).collect();
    let probe = ConcurrencyProbe::default();

    ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| {
                let probe = probe.clone();
                async move {
                    probe.observe(yield_times(2)).await;
                    Ok(item)
                }
            },
            &config(3, 10)?,
            NoopHooks,
        )
        .await?;

    assert_eq!(probe.peak(), 3);
    Ok(())
}

#[tokio::test]
async fn failing_items_do_not_stop_the_run() -> Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=10).collect();
    let mut hooks = RecordingHooks::default();

    let result = ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| double_unless_multiple(item, 3),
            &config(4, 2)?,
            &mut hooks,
        )
        .await?;

    assert_eq!(result.processed, 7);
    assert_eq!(result.failed, 3);
    assert_eq!(result.total_settled(), items.len() as u64);

    let mut failed: Vec<u32> = hooks
        .events
        .iter()
        .filter_map(|event| match event {
            Event::ItemError { item, .. } => Some(*item),
            _ => None,
        })
        .collect();
    failed.sort_unstable();
    assert_eq!(failed, vec![3, 6, 9]);

    let last_error = hooks.events.iter().rev().find_map(|event| match event {
        Event::ItemError { total_failed, .. } => Some(*total_failed),
        _ => None,
    });
    assert_eq!(last_error, Some(3));
    Ok(())
}

#[tokio::test]
async fn empty_input_returns_seeded_counters() -> Result<()> {
    init_tracing();
    let seed = Snapshot::new().with_counters(5, 1);
    let config = BatchConfig::builder().initial_state(seed.clone()).build()?;
    let mut hooks = RecordingHooks::default();

    let result = ArrayBatchExecutor::new()
        .run(
            &[] as &[u32],
            |item: u32, _index: usize, _state: Arc<Snapshot>| async move { Ok(item) },
            &config,
            &mut hooks,
        )
        .await?;

    assert_eq!((result.processed, result.failed), (5, 1));
    assert_eq!(result.state, seed);
    assert!(hooks.events.is_empty());
    Ok(())
}

#[tokio::test]
async fn seeded_counters_keep_counting() -> Result<()> {
    init_tracing();
    let config = BatchConfig::builder()
        .batch_size(2)
        .concurrency_limit(1)
        .initial_state(Snapshot::new().with_counters(5, 1))
        .build()?;
    let mut hooks = RecordingHooks::default();

    let result = ArrayBatchExecutor::new()
        .run(
            &[10u32, 11, 12, 13],
            |item: u32, _index: usize, _state: Arc<Snapshot>| async move { Ok(item) },
            &config,
            &mut hooks,
        )
        .await?;

    assert_eq!((result.processed, result.failed), (9, 1));
    let first = hooks.events.iter().find_map(|event| match event {
        Event::ItemSuccess { total_processed, .. } => Some(*total_processed),
        _ => None,
    });
    assert_eq!(first, Some(6));
    Ok(())
}

#[tokio::test]
async fn process_receives_index_within_batch() -> Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=5).collect();
    let seen = Mutex::new(Vec::new());

    ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, index: usize, _state: Arc<Snapshot>| {
                seen.lock().unwrap().push((item, index));
                async move { Ok(item) }
            },
            &config(2, 2)?,
            NoopHooks,
        )
        .await?;

    let mut seen = seen.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, vec![(1, 0), (2, 1), (3, 0), (4, 1), (5, 0)]);
    Ok(())
}

#[tokio::test]
async fn state_updates_follow_the_interval() -> Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=7).collect();
    let config = BatchConfig::builder()
        .concurrency_limit(1)
        .state_update_interval(3)
        .build()?;
    let mut hooks = RecordingHooks::default();

    ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| async move { Ok(item) },
            &config,
            &mut hooks,
        )
        .await?;

    let updates: Vec<(u64, Option<BatchPosition>)> = hooks
        .state_updates()
        .into_iter()
        .filter_map(|event| match event {
            Event::StateUpdate {
                processed,
                position,
                ..
            } => Some((*processed, *position)),
            _ => None,
        })
        .collect();
    let only_batch = Some(BatchPosition::new(1, 1));
    assert_eq!(
        updates,
        vec![(3, only_batch), (6, only_batch), (7, only_batch), (7, only_batch)]
    );
    Ok(())
}

#[tokio::test]
async fn hook_failure_aborts_with_stage() -> Result<()> {
    init_tracing();
    let items: Vec<u32> = (1..=6).collect();
    let attempted = Mutex::new(Vec::new());
    let mut hooks = RecordingHooks::failing_on_batch_start(2);

    let err = ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| {
                attempted.lock().unwrap().push(item);
                async move { Ok(item) }
            },
            &config(2, 2)?,
            &mut hooks,
        )
        .await
        .expect_err("batch 2 start hook should abort the run");

    assert_eq!(err.stage(), RunStage::BatchStart);
    assert!(err.to_string().contains("refusing to start batch 2"));
    assert_eq!(attempted.into_inner().unwrap(), vec![1, 2]);
    assert_eq!(hooks.batch_starts(), vec![(1, 3)]);
    Ok(())
}

#[tokio::test]
async fn extension_fields_survive_every_update() -> Result<()> {
    init_tracing();
    let config = BatchConfig::builder()
        .batch_size(3)
        .state_update_interval(1)
        .initial_state(Snapshot::new().with_field("job", "nightly-sync"))
        .build()?;
    let mut hooks = RecordingHooks::default();

    let result = ArrayBatchExecutor::new()
        .run(
            &[1u32, 2, 3, 4, 5],
            |item: u32, _index: usize, _state: Arc<Snapshot>| async move { Ok(item) },
            &config,
            &mut hooks,
        )
        .await?;

    assert!(!hooks.states.is_empty());
    for state in &hooks.states {
        assert_eq!(state.field("job"), Some(&serde_json::json!("nightly-sync")));
    }
    assert_eq!(result.state.field("job"), Some(&serde_json::json!("nightly-sync")));
    Ok(())
}

#[tokio::test]
async fn timestamps_come_from_the_clock() -> Result<()> {
    init_tracing();
    let started = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
    let clock = Arc::new(FixedClock::new(now));

    let fresh = ArrayBatchExecutor::with_clock(clock.clone())
        .run(
            &[1u32, 2],
            |item: u32, _index: usize, _state: Arc<Snapshot>| async move { Ok(item) },
            &BatchConfig::default(),
            NoopHooks,
        )
        .await?;
    assert_eq!(fresh.state.started_at, Some(now));
    assert_eq!(fresh.state.last_updated, Some(now));

    let mut seed = Snapshot::new().with_counters(2, 0);
    seed.started_at = Some(started);
    let config = BatchConfig::builder().initial_state(seed).build()?;
    clock.advance(chrono::Duration::minutes(5));

    let resumed = ArrayBatchExecutor::with_clock(clock)
        .run(
            &[3u32],
            |item: u32, _index: usize, _state: Arc<Snapshot>| async move { Ok(item) },
            &config,
            NoopHooks,
        )
        .await?;
    assert_eq!(resumed.state.started_at, Some(started));
    assert_eq!(
        resumed.state.last_updated,
        Some(now + chrono::Duration::minutes(5))
    );
    Ok(())
}

#[tokio::test]
async fn process_sees_snapshot_current_at_admission() -> Result<()> {
    init_tracing();
    let config = BatchConfig::builder()
        .concurrency_limit(1)
        .state_update_interval(1)
        .build()?;
    let seen = Mutex::new(Vec::new());

    ArrayBatchExecutor::new()
        .run(
            &[1u32, 2, 3],
            |item: u32, _index: usize, state: Arc<Snapshot>| {
                seen.lock().unwrap().push(state.total_processed);
                async move { Ok(item) }
            },
            &config,
            NoopHooks,
        )
        .await?;

    assert_eq!(seen.into_inner().unwrap(), vec![0, 1, 2]);
    Ok(())
}

#[tokio::test]
async fn telemetry_tracks_the_run() -> Result<()> {
    init_tracing();
    let executor = ArrayBatchExecutor::new();

    executor
        .run(
            &[1u32, 2, 3, 4, 5],
            |item: u32, _index: usize, _state: Arc<Snapshot>| async move {
                if item == 2 {
                    anyhow::bail!("item 2 rejected");
                }
                Ok(item)
            },
            &config(2, 1)?,
            LoggingHooks,
        )
        .await?;

    assert_eq!(
        executor.telemetry().snapshot(),
        TelemetrySnapshot {
            items_succeeded: 4,
            items_failed: 1,
            batches_completed: 3,
            pages_fetched: 0,
            empty_pages: 0,
            state_updates: 5,
        }
    );
    Ok(())
}

/// Yields inside batch-start and item-success hooks and notes any item
/// admission or progress made while the hook was suspended.
struct SuspendingHooks {
    admitted: Arc<AtomicUsize>,
    steps: Arc<AtomicUsize>,
    calls: usize,
    overlaps: Vec<String>,
}

impl SuspendingHooks {
    fn observed(&self) -> (usize, usize) {
        (
            self.admitted.load(Ordering::SeqCst),
            self.steps.load(Ordering::SeqCst),
        )
    }

    fn suspend(&mut self, hook: &'static str) -> HookFuture<'_> {
        Box::pin(async move {
            let before = self.observed();
            yield_times(5).await;
            let after = self.observed();
            self.calls += 1;
            if before != after {
                self.overlaps
                    .push(format!("{hook}: {before:?} -> {after:?}"));
            }
            Ok(())
        })
    }
}

impl BatchHooks<u32, u32> for SuspendingHooks {
    fn on_batch_start<'a>(
        &'a mut self,
        _position: BatchPosition,
        _batch: &'a [u32],
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        self.suspend("batch start")
    }

    fn on_item_success<'a>(
        &'a mut self,
        _item: &'a u32,
        _result: &'a u32,
        _total_processed: u64,
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        self.suspend("item success")
    }
}

#[tokio::test]
async fn suspended_hooks_hold_back_every_item() -> Result<()> {
    init_tracing();
    let admitted = Arc::new(AtomicUsize::new(0));
    let steps = Arc::new(AtomicUsize::new(0));
    let mut hooks = SuspendingHooks {
        admitted: admitted.clone(),
        steps: steps.clone(),
        calls: 0,
        overlaps: Vec::new(),
    };
    let items: Vec<u32> = (1..=8).collect();

    let result = ArrayBatchExecutor::new()
        .run(
            &items,
            |item: u32, _index: usize, _state: Arc<Snapshot>| {
                admitted.fetch_add(1, Ordering::SeqCst);
                let steps = steps.clone();
                async move {
                    for _ in 0..3 {
                        tokio::task::yield_now().await;
                        steps.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(item)
                }
            },
            &config(4, 3)?,
            &mut hooks,
        )
        .await?;

    assert_eq!(result.processed, 8);
    assert_eq!(hooks.calls, 2 + 8);
    assert!(hooks.overlaps.is_empty(), "items moved during hooks: {:?}", hooks.overlaps);
    assert_eq!(admitted.load(Ordering::SeqCst), 8);
    assert_eq!(steps.load(Ordering::SeqCst), 24);
    Ok(())
}
