use anyhow::Error as AnyError;

/// Point of a run at which a fatal error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadState,
    FetchPage,
    BatchStart,
    BatchComplete,
    PageStart,
    PageComplete,
    ItemSuccess,
    ItemError,
    StateUpdate,
}

/// Error that aborted a run. Item failures never produce one.
#[derive(Debug)]
pub struct RunError {
    stage: RunStage,
    source: AnyError,
}

impl RunError {
    pub fn new(stage: RunStage, source: AnyError) -> Self {
        Self { stage, source }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn into_source(self) -> AnyError {
        self.source
    }
}

impl core::fmt::Display for RunError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "batch run aborted at {:?}: {}", self.stage, self.source)
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Tags an `anyhow` result with the stage it came from.
pub(crate) trait StageContext<T> {
    fn at_stage(self, stage: RunStage) -> Result<T, RunError>;
}

impl<T> StageContext<T> for anyhow::Result<T> {
    fn at_stage(self, stage: RunStage) -> Result<T, RunError> {
        self.map_err(|source| RunError::new(stage, source))
    }
}
