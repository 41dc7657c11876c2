use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Progress record threaded through a batch run.
///
/// Reserved fields are typed; every other key of the persisted JSON document is
/// kept verbatim in [`Snapshot::extensions`] and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub total_processed: u64,
    pub total_failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(
        rename = "startTime",
        alias = "startedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the completion counters, typically from a previous run.
    pub fn with_counters(mut self, total_processed: u64, total_failed: u64) -> Self {
        self.total_processed = total_processed;
        self.total_failed = total_failed;
        self
    }

    /// Seeds the pagination cursor.
    pub fn with_cursor(mut self, current_page: u64, total_pages: u64) -> Self {
        self.current_page = Some(current_page);
        self.total_pages = Some(total_pages);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// Number of completion events (successes and failures) recorded so far.
    pub fn total_settled(&self) -> u64 {
        self.total_processed.saturating_add(self.total_failed)
    }

    /// Shallow merge: keys from `fields` overwrite, every other key is untouched.
    pub fn merge_extensions(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            self.extensions.insert(key, value);
        }
    }

    /// True when nothing has ever been recorded: no counters, cursor, timestamps or fields.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
