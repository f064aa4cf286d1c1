//! Work-item contract consumed by the runtime, plus task classification enums.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

/// Scheduling priority attached to a work item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Can be deferred.
    Low,
    /// Standard processing.
    #[default]
    Normal,
    /// Expedited processing.
    High,
    /// Immediate processing required.
    Critical,
}

impl TaskPriority {
    /// Returns `true` when `self` outranks `other`.
    #[must_use]
    pub fn is_higher_than(self, other: Self) -> bool {
        self > other
    }

    /// Human-readable description of the priority level.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Low => "can be deferred",
            Self::Normal => "standard processing",
            Self::High => "expedited processing",
            Self::Critical => "immediate processing required",
        }
    }
}

/// Complexity classification used for resource planning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSize {
    /// Quick completion, minimal resources.
    Small,
    /// Moderate complexity.
    #[default]
    Medium,
    /// Complex processing.
    Large,
    /// Extensive processing; usually worth splitting.
    ExtraLarge,
}

impl TaskSize {
    /// Returns `true` when `self` is a larger class than `other`.
    #[must_use]
    pub fn is_larger_than(self, other: Self) -> bool {
        self > other
    }

    /// Returns `true` for classes that callers should consider splitting.
    #[must_use]
    pub const fn should_consider_splitting(self) -> bool {
        matches!(self, Self::Large | Self::ExtraLarge)
    }

    /// Relative processing weight: 1, 2, 4, 8.
    #[must_use]
    pub const fn processing_weight(self) -> u32 {
        match self {
            Self::Small => 1,
            Self::Medium => 2,
            Self::Large => 4,
            Self::ExtraLarge => 8,
        }
    }
}

/// Processing status of an individual task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not yet assigned.
    #[default]
    Created,
    /// Assigned to an agent.
    Assigned,
    /// Currently being processed.
    Processing,
    /// Finished successfully.
    Completed,
    /// Processing failed.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl TaskStatus {
    /// Returns `true` once no further status change is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` while the task is being processed.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Returns `true` before processing has begun.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Created | Self::Assigned)
    }

    /// Returns `true` when the status table allows moving from `self` to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Assigned | Self::Cancelled)
                | (Self::Assigned, Self::Processing | Self::Cancelled)
                | (
                    Self::Processing,
                    Self::Completed | Self::Failed | Self::Cancelled
                )
        )
    }
}

/// Anything an agent can be asked to process.
///
/// The runtime treats work items as opaque payloads: it only reads the
/// classification accessors for metrics and the textual description for the
/// execution history.
pub trait WorkItem: fmt::Display + Send + Sync + 'static {
    /// Scheduling priority; defaults to [`TaskPriority::Normal`].
    fn priority(&self) -> TaskPriority {
        TaskPriority::default()
    }

    /// Size classification; defaults to [`TaskSize::Medium`].
    fn size(&self) -> TaskSize {
        TaskSize::default()
    }

    /// Approximate input size in caller-defined units.
    fn input_size(&self) -> u64 {
        0
    }

    /// Text recorded in the execution history.
    fn describe(&self) -> String {
        self.to_string()
    }
}

/// General purpose work item carrying a description and free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicTask {
    id: Uuid,
    created_at: DateTime<Utc>,
    description: String,
    #[serde(default)]
    priority: TaskPriority,
    #[serde(default)]
    size: TaskSize,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

impl BasicTask {
    /// Creates a task with default priority and size.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            description: description.into(),
            priority: TaskPriority::default(),
            size: TaskSize::default(),
            status: TaskStatus::default(),
            metadata: Map::new(),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the size classification.
    #[must_use]
    pub fn with_size(mut self, size: TaskSize) -> Self {
        self.size = size;
        self
    }

    /// Attaches a metadata value.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the metadata map.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Moves the task to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskStatus`] when the status table forbids the move.
    pub fn advance(&mut self, next: TaskStatus) -> Result<TaskStatus> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTaskStatus {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(next)
    }
}

impl fmt::Display for BasicTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl WorkItem for BasicTask {
    fn priority(&self) -> TaskPriority {
        self.priority
    }

    fn size(&self) -> TaskSize {
        self.size
    }

    fn input_size(&self) -> u64 {
        self.description.len() as u64
    }
}
