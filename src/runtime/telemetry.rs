use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lifetime counters of a driver, readable while a run is in progress.
#[derive(Default, Debug)]
pub struct Telemetry {
    items_succeeded: AtomicU64,
    items_failed: AtomicU64,
    batches_completed: AtomicU64,
    pages_fetched: AtomicU64,
    empty_pages: AtomicU64,
    state_updates: AtomicU64,
}

impl Telemetry {
    pub fn record_item_success(&self) {
        self.items_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_failure(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_fetched(&self, empty: bool) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        if empty {
            self.empty_pages.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_state_update(&self) {
        self.state_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            items_succeeded: self.items_succeeded.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            empty_pages: self.empty_pages.load(Ordering::Relaxed),
            state_updates: self.state_updates.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub items_succeeded: u64,
    pub items_failed: u64,
    pub batches_completed: u64,
    pub pages_fetched: u64,
    pub empty_pages: u64,
    pub state_updates: u64,
}
