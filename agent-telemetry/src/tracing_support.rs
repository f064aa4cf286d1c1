//! Structured tracing helpers.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback filter directive could not be parsed.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Directive that failed to parse.
        directive: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was already installed.
    #[error("tracing subscriber already initialised: {0}")]
    AlreadyInitialised(String),
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by `default_directive`
/// when the variable is unset or invalid.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when `default_directive` is needed
/// but malformed, and [`TelemetryError::AlreadyInitialised`] when a global
/// subscriber already exists.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|err| {
            TelemetryError::InvalidFilter {
                directive: default_directive.to_owned(),
                reason: err.to_string(),
            }
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInitialised(err.to_string()))?;
    tracing::debug!(default_directive, "tracing subscriber installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_existing_subscriber() {
        let first = init_tracing("debug");
        let second = init_tracing("debug");
        assert!(first.is_ok() || matches!(first, Err(TelemetryError::AlreadyInitialised(_))));
        assert!(matches!(second, Err(TelemetryError::AlreadyInitialised(_))));
    }
}
