use crate::state::snapshot::Snapshot;
use anyhow::{bail, Result};

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;
pub const DEFAULT_STATE_UPDATE_INTERVAL: u64 = 5;
pub const DEFAULT_INITIAL_PAGE: u64 = 1;

/// Per-run configuration shared by the array executor and the paginated driver.
///
/// Instances are constructed via [`BatchConfig::builder`], [`BatchConfig::new`] or
/// [`BatchConfig::default`] so every value is validated before a run observes it.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    batch_size: usize,
    concurrency_limit: usize,
    state_update_interval: u64,
    initial_page: u64,
    initial_state: Snapshot,
}

pub struct BatchConfigParams {
    pub batch_size: usize,
    pub concurrency_limit: usize,
    pub state_update_interval: u64,
    pub initial_page: u64,
    pub initial_state: Snapshot,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            state_update_interval: DEFAULT_STATE_UPDATE_INTERVAL,
            initial_page: DEFAULT_INITIAL_PAGE,
            initial_state: Snapshot::default(),
        }
    }
}

impl BatchConfig {
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    pub fn new(params: BatchConfigParams) -> Result<Self> {
        let BatchConfigParams {
            batch_size,
            concurrency_limit,
            state_update_interval,
            initial_page,
            initial_state,
        } = params;

        let config = Self {
            batch_size,
            concurrency_limit,
            state_update_interval,
            initial_page,
            initial_state,
        };

        config.validate()?;
        Ok(config)
    }

    /// Items per batch in array mode.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Upper bound on simultaneously in-flight item operations.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Successful completions between mid-batch snapshot emissions.
    pub fn state_update_interval(&self) -> u64 {
        self.state_update_interval
    }

    /// Page requested first when the seed snapshot carries no cursor.
    pub fn initial_page(&self) -> u64 {
        self.initial_page
    }

    /// Snapshot the run is seeded from.
    pub fn initial_state(&self) -> &Snapshot {
        &self.initial_state
    }

    /// Returns a copy of this configuration seeded from `state`.
    pub fn with_initial_state(&self, state: Snapshot) -> Self {
        Self {
            initial_state: state,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be greater than 0");
        }

        if self.concurrency_limit == 0 {
            bail!("concurrency_limit must be greater than 0");
        }

        if self.state_update_interval == 0 {
            bail!("state_update_interval must be greater than 0");
        }

        if self.initial_page == 0 {
            bail!("initial_page must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct BatchConfigBuilder {
    batch_size: Option<usize>,
    concurrency_limit: Option<usize>,
    state_update_interval: Option<u64>,
    initial_page: Option<u64>,
    initial_state: Option<Snapshot>,
}

impl BatchConfigBuilder {
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    pub fn state_update_interval(mut self, interval: u64) -> Self {
        self.state_update_interval = Some(interval);
        self
    }

    pub fn initial_page(mut self, page: u64) -> Self {
        self.initial_page = Some(page);
        self
    }

    pub fn initial_state(mut self, state: Snapshot) -> Self {
        self.initial_state = Some(state);
        self
    }

    pub fn build(self) -> Result<BatchConfig> {
        BatchConfig::new(BatchConfigParams {
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            concurrency_limit: self.concurrency_limit.unwrap_or(DEFAULT_CONCURRENCY_LIMIT),
            state_update_interval: self
                .state_update_interval
                .unwrap_or(DEFAULT_STATE_UPDATE_INTERVAL),
            initial_page: self.initial_page.unwrap_or(DEFAULT_INITIAL_PAGE),
            initial_state: self.initial_state.unwrap_or_default(),
        })
    }
}
