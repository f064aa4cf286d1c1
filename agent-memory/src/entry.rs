//! A single recorded task outcome.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record of one finished task.
///
/// Entries are created once, when the task finishes, and never change
/// afterwards; they leave the history only through compaction or a clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    id: u64,
    timestamp: DateTime<Utc>,
    task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    success: bool,
    duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    learning: Option<String>,
}

impl MemoryEntry {
    pub(crate) fn new(
        id: u64,
        task: String,
        result: Option<String>,
        success: bool,
        duration: Duration,
        learning: Option<String>,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            task,
            result,
            success,
            duration,
            learning,
        }
    }

    /// Monotonic identifier, unique within one memory instance.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Time the entry was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Description of the task.
    #[must_use]
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Description of the result, absent for failed tasks.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Whether the task succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Time spent processing the task.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Learning captured alongside the outcome.
    #[must_use]
    pub fn learning(&self) -> Option<&str> {
        self.learning.as_deref()
    }

    /// Case-insensitive match of an already lower-cased needle against the
    /// task, result, and learning text.
    pub(crate) fn mentions(&self, needle: &str) -> bool {
        let hit = |text: &str| text.to_lowercase().contains(needle);
        hit(&self.task)
            || self.result.as_deref().is_some_and(hit)
            || self.learning.as_deref().is_some_and(hit)
    }
}
