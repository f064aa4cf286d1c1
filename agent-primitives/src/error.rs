//! Shared error definitions for agent primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the agent runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating agent primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided agent identifier could not be parsed.
    #[error("invalid agent id: {source}")]
    InvalidAgentId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Agent identity failed validation.
    #[error("invalid agent identity: {reason}")]
    InvalidIdentity {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A task status change is not allowed by the status table.
    #[error("task status cannot move from {from:?} to {to:?}")]
    InvalidTaskStatus {
        /// Status held before the attempted change.
        from: crate::TaskStatus,
        /// Status that was requested.
        to: crate::TaskStatus,
    },
}

impl Error {
    pub(crate) fn identity(reason: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            reason: reason.into(),
        }
    }
}
