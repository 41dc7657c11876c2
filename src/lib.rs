pub mod execution;
pub mod processor;
pub mod runtime;
pub mod state;

pub use execution::batch::{BatchPlan, BatchPosition};
pub use execution::gate::ConcurrencyGate;
pub use processor::array::ArrayBatchExecutor;
pub use processor::page::PageData;
pub use processor::paginated::PaginatedBatchDriver;
pub use processor::result::BatchResult;
pub use processor::resumable::ResumableProcessor;
pub use runtime::clock::{Clock, FixedClock, SystemClock};
pub use runtime::config::{BatchConfig, BatchConfigBuilder, BatchConfigParams};
pub use runtime::error::{RunError, RunStage};
pub use runtime::hooks::{BatchHooks, HookFuture, NoopHooks};
pub use runtime::report::{LoggingHooks, ProgressReport};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use state::snapshot::Snapshot;
pub use state::store::{JsonFileStore, StateStore, StoreFuture};
