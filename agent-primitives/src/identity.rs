//! Immutable identity attached to every agent instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AgentId, Error, Result};

/// Who an agent is: identifier, display name, build version, and advertised capabilities.
///
/// Identities are fixed at construction; the runtime only ever hands out shared
/// references to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    id: AgentId,
    name: String,
    version: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    capabilities: Vec<String>,
}

impl AgentIdentity {
    /// Starts building an identity for an agent with the given display name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> AgentIdentityBuilder {
        AgentIdentityBuilder {
            id: None,
            name: name.into(),
            version: "0.1.0".to_owned(),
            capabilities: Vec::new(),
        }
    }

    /// Returns the agent identifier.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the version string of the agent build.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the instant the identity was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the advertised capability labels.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }
}

/// Builder for [`AgentIdentity`].
#[derive(Debug)]
pub struct AgentIdentityBuilder {
    id: Option<AgentId>,
    name: String,
    version: String,
    capabilities: Vec<String>,
}

impl AgentIdentityBuilder {
    /// Pins the identifier instead of generating a random one.
    #[must_use]
    pub fn id(mut self, id: AgentId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the version string.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Adds a capability label.
    #[must_use]
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Replaces the capability labels.
    #[must_use]
    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Validates the inputs and stamps the creation time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] when the name, the version, or any
    /// capability label is blank.
    pub fn build(self) -> Result<AgentIdentity> {
        if self.name.trim().is_empty() {
            return Err(Error::identity("agent name cannot be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(Error::identity("agent version cannot be empty"));
        }
        if self.capabilities.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::identity("capability labels cannot be empty"));
        }

        Ok(AgentIdentity {
            id: self.id.unwrap_or_else(AgentId::random),
            name: self.name,
            version: self.version,
            created_at: Utc::now(),
            capabilities: self.capabilities,
        })
    }
}
