//! Strongly typed configuration schema.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{ConfigError, ConfigResult};

/// Default upper bound advertised to handlers for a single task.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default time `stop` waits for the worker to drain before forcing it down.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of execution-history entries retained per agent.
pub const DEFAULT_MEMORY_CAPACITY: NonZeroUsize = NonZeroUsize::new(1000).unwrap();

/// Immutable runtime configuration for a single agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    instructions: Option<String>,
    task_timeout: Duration,
    shutdown_timeout: Duration,
    max_concurrent_tasks: NonZeroUsize,
    metrics_enabled: bool,
    memory_capacity: NonZeroUsize,
    properties: Map<String, Value>,
}

impl AgentConfig {
    /// Starts a builder populated with defaults.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Returns the instructions text, if any.
    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Returns the per-task timeout.
    #[must_use]
    pub const fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the advertised concurrency limit.
    #[must_use]
    pub const fn max_concurrent_tasks(&self) -> NonZeroUsize {
        self.max_concurrent_tasks
    }

    /// Returns `true` when metrics collection is enabled.
    #[must_use]
    pub const fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }

    /// Returns the execution-history capacity.
    #[must_use]
    pub const fn memory_capacity(&self) -> NonZeroUsize {
        self.memory_capacity
    }

    /// Returns every free-form property.
    #[must_use]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Returns the raw JSON value of a property.
    #[must_use]
    pub fn property_value(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Reads a property as `T`.
    ///
    /// Returns `None` when the key is absent or its value does not deserialize
    /// into `T`.
    #[must_use]
    pub fn property<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// Reads a property as `T`, falling back to `default` when absent or mistyped.
    #[must_use]
    pub fn property_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.property(key).unwrap_or(default)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instructions: None,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_concurrent_tasks: NonZeroUsize::MIN,
            metrics_enabled: true,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            properties: Map::new(),
        }
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone)]
pub struct AgentConfigBuilder {
    instructions: Option<String>,
    task_timeout: Duration,
    shutdown_timeout: Duration,
    max_concurrent_tasks: usize,
    metrics_enabled: bool,
    memory_capacity: usize,
    properties: Map<String, Value>,
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self {
            instructions: None,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_concurrent_tasks: 1,
            metrics_enabled: true,
            memory_capacity: DEFAULT_MEMORY_CAPACITY.get(),
            properties: Map::new(),
        }
    }
}

impl AgentConfigBuilder {
    /// Sets the instructions text.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Sets the per-task timeout.
    #[must_use]
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the concurrency limit; values below one clamp to one.
    #[must_use]
    pub fn max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max.max(1);
        self
    }

    /// Enables or disables metrics collection.
    #[must_use]
    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Sets the execution-history capacity.
    #[must_use]
    pub fn memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    /// Sets a property. A JSON `null` removes the key instead.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        match value.into() {
            Value::Null => {
                self.properties.remove(&key);
            }
            value => {
                self.properties.insert(key, value);
            }
        }
        self
    }

    /// Merges a map of properties, overwriting duplicate keys.
    #[must_use]
    pub fn properties(mut self, properties: Map<String, Value>) -> Self {
        for (key, value) in properties {
            self = self.property(key, value);
        }
        self
    }

    /// Validates the values and freezes them into an [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a timeout is zero or the memory
    /// capacity is zero.
    pub fn build(self) -> ConfigResult<AgentConfig> {
        if self.task_timeout.is_zero() {
            return Err(ConfigError::Invalid("task timeout must be greater than zero"));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "shutdown timeout must be greater than zero",
            ));
        }
        let memory_capacity = NonZeroUsize::new(self.memory_capacity)
            .ok_or(ConfigError::Invalid("memory capacity must be greater than zero"))?;
        let max_concurrent_tasks =
            NonZeroUsize::new(self.max_concurrent_tasks).unwrap_or(NonZeroUsize::MIN);

        Ok(AgentConfig {
            instructions: self.instructions,
            task_timeout: self.task_timeout,
            shutdown_timeout: self.shutdown_timeout,
            max_concurrent_tasks,
            metrics_enabled: self.metrics_enabled,
            memory_capacity,
            properties: self.properties,
        })
    }
}
