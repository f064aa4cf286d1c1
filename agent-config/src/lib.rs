//! Configuration management for agents.
//!
//! An [`AgentConfig`] is assembled once, either through [`AgentConfigBuilder`] or by
//! loading a JSON document, and is read-only for the rest of the agent's life.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use schema::{
    AgentConfig, AgentConfigBuilder, DEFAULT_MEMORY_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
    DEFAULT_TASK_TIMEOUT,
};
