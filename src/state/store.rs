use crate::state::snapshot::Snapshot;
use anyhow::{Context, Result};
use core::future::Future;
use core::pin::Pin;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Durable home for a run's [`Snapshot`].
pub trait StateStore: Send + Sync {
    /// Returns the persisted snapshot, or an empty one when nothing usable is stored.
    fn load(&self) -> StoreFuture<'_, Snapshot>;

    /// Replaces the persisted snapshot.
    fn save<'a>(&'a self, snapshot: &'a Snapshot) -> StoreFuture<'a, ()>;

    /// Removes the persisted snapshot. Clearing an absent snapshot is not an error.
    fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Stores the snapshot as a pretty-printed JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_snapshot(&self) -> Result<Snapshot> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    target: "batchwise::state",
                    path = %self.path.display(),
                    "no persisted state; starting empty"
                );
                return Ok(Snapshot::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read state file {}", self.path.display())
                })
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                tracing::warn!(
                    target: "batchwise::state",
                    path = %self.path.display(),
                    error = %err,
                    "persisted state is not valid JSON; starting empty"
                );
                Ok(Snapshot::default())
            }
        }
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("failed to create state directory {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_vec_pretty(snapshot).context("failed to serialize state")?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, &json)
            .await
            .with_context(|| format!("failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("failed to replace state file {}", self.path.display()))?;

        tracing::trace!(
            target: "batchwise::state",
            path = %self.path.display(),
            processed = snapshot.total_processed,
            failed = snapshot.total_failed,
            "state saved"
        );
        Ok(())
    }

    async fn remove_snapshot(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove state file {}", self.path.display())),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> StoreFuture<'_, Snapshot> {
        Box::pin(self.read_snapshot())
    }

    fn save<'a>(&'a self, snapshot: &'a Snapshot) -> StoreFuture<'a, ()> {
        Box::pin(self.write_snapshot(snapshot))
    }

    fn clear(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.remove_snapshot())
    }
}
