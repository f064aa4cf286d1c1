//! Error types for the memory subsystem.

use thiserror::Error;

/// Errors emitted by memory components.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    /// The provided configuration was invalid.
    #[error("invalid memory configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
