//! Loading [`AgentConfig`] values from JSON documents.
//!
//! Durations are written in milliseconds:
//!
//! ```json
//! {
//!   "instructions": "Summarise incoming tickets",
//!   "task_timeout_ms": 60000,
//!   "shutdown_timeout_ms": 5000,
//!   "memory_capacity": 200,
//!   "properties": { "model": "small" }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{AgentConfig, ConfigError, ConfigResult};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDocument {
    instructions: Option<String>,
    task_timeout_ms: Option<u64>,
    shutdown_timeout_ms: Option<u64>,
    max_concurrent_tasks: Option<usize>,
    metrics_enabled: Option<bool>,
    memory_capacity: Option<usize>,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl ConfigDocument {
    fn into_config(self) -> ConfigResult<AgentConfig> {
        let mut builder = AgentConfig::builder().properties(self.properties);
        if let Some(instructions) = self.instructions {
            builder = builder.instructions(instructions);
        }
        if let Some(ms) = self.task_timeout_ms {
            builder = builder.task_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.shutdown_timeout_ms {
            builder = builder.shutdown_timeout(Duration::from_millis(ms));
        }
        if let Some(max) = self.max_concurrent_tasks {
            builder = builder.max_concurrent_tasks(max);
        }
        if let Some(enabled) = self.metrics_enabled {
            builder = builder.metrics_enabled(enabled);
        }
        if let Some(capacity) = self.memory_capacity {
            builder = builder.memory_capacity(capacity);
        }
        builder.build()
    }
}

/// Parses a configuration from JSON text. Omitted fields keep their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields and
/// [`ConfigError::Invalid`] when a value fails validation.
pub fn from_json_str(json: &str) -> ConfigResult<AgentConfig> {
    let document: ConfigDocument = serde_json::from_str(json)?;
    document.into_config()
}

/// Reads and parses a JSON configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
/// same errors as [`from_json_str`].
pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<AgentConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = from_json_str(&text)?;
    debug!(path = %path.display(), "loaded agent configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("agent-config-{}.json", uuid::Uuid::new_v4()));
        path
    }

    #[test]
    fn parses_full_document() {
        let config = from_json_str(
            r#"{
                "instructions": "triage",
                "task_timeout_ms": 1500,
                "shutdown_timeout_ms": 250,
                "max_concurrent_tasks": 4,
                "metrics_enabled": false,
                "memory_capacity": 10,
                "properties": {"model": "small", "temperature": 0.2}
            }"#,
        )
        .unwrap();

        assert_eq!(config.instructions(), Some("triage"));
        assert_eq!(config.task_timeout(), Duration::from_millis(1500));
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(250));
        assert_eq!(config.max_concurrent_tasks().get(), 4);
        assert!(!config.metrics_enabled());
        assert_eq!(config.memory_capacity().get(), 10);
        assert_eq!(config.property::<f64>("temperature"), Some(0.2));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = from_json_str("{}").unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn rejects_unknown_fields_and_invalid_values() {
        let err = from_json_str(r#"{"shutdown_timeout": 5}"#).expect_err("unknown field");
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = from_json_str(r#"{"task_timeout_ms": 0}"#).expect_err("zero timeout");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn reads_from_file() {
        let path = temp_path();
        std::fs::write(&path, r#"{"memory_capacity": 42}"#).unwrap();
        let config = from_path(&path).unwrap();
        assert_eq!(config.memory_capacity().get(), 42);
        let _ = std::fs::remove_file(&path);

        let err = from_path(&path).expect_err("file removed");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
