//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors emitted while building or loading an [`AgentConfig`](crate::AgentConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value failed validation.
    #[error("invalid agent configuration: {0}")]
    Invalid(&'static str),
    /// The configuration file could not be read.
    #[error("failed to read configuration from {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration document was not valid JSON for the schema.
    #[error("malformed configuration document: {source}")]
    Parse {
        /// Source [`serde_json::Error`].
        #[from]
        source: serde_json::Error,
    },
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
