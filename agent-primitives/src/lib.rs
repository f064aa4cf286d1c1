//! Core shared types for task-processing agents.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod identity;
mod ids;
mod task;

/// Error type and result alias shared across the runtime.
pub use error::{Error, Result};
/// Immutable agent identity and its builder.
pub use identity::{AgentIdentity, AgentIdentityBuilder};
/// Unique identifier for agents.
pub use ids::AgentId;
/// Work-item contract and task classification enums.
pub use task::{BasicTask, TaskPriority, TaskSize, TaskStatus, WorkItem};
