//! Agent and tool registration records.
//!
//! The Coordinator holds the live agent registry; a persistent mirror lives
//! at `data/config/official_agents_registry.json`. Tools are cataloged in
//! `data/config/official_tools_registry.json`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into the persistent agents registry.
pub const AGENTS_SCHEMA_VERSION: u32 = 1;

/// Schema version written into the persistent tools registry.
pub const TOOLS_SCHEMA_VERSION: u32 = 1;

/// Status of a registered agent or tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Registered,
    Disabled,
}

impl Default for RegistrationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Registered => "registered",
            Self::Disabled => "disabled",
        }
    }
}

/// A registered agent as held by the Coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub agent_id: String,
    pub agent_type: String,
    pub description: String,
    /// Public address of the agent's identity, when one exists.
    #[serde(default)]
    pub public_address: Option<String>,
    /// Hex signature over `"agent_registration:<agent_id>"`.
    #[serde(default)]
    pub signature: Option<String>,
    pub status: RegistrationStatus,
    /// Whether the agent may be admitted by the Guardian.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub registered_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl AgentRegistration {
    pub fn new(
        agent_id: impl Into<String>,
        agent_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            description: description.into(),
            public_address: None,
            signature: None,
            status: RegistrationStatus::Pending,
            enabled: true,
            registered_at: Utc::now(),
        }
    }

    /// The literal payload an agent signs to prove it requested registration.
    pub fn signature_payload(agent_id: &str) -> String {
        format!("agent_registration:{agent_id}")
    }

    /// An agent is admissible when enabled and carrying a non-empty identity.
    pub fn is_admissible(&self) -> bool {
        self.enabled
            && self.status != RegistrationStatus::Disabled
            && self
                .public_address
                .as_deref()
                .is_some_and(|a| !a.is_empty())
    }
}

/// Persistent agents registry document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsRegistryDoc {
    pub agents_schema_version: u32,
    /// Keyed by agent id; BTreeMap keeps snapshots diff-stable.
    pub registered_agents: BTreeMap<String, AgentRegistration>,
}

impl Default for AgentsRegistryDoc {
    fn default() -> Self {
        Self {
            agents_schema_version: AGENTS_SCHEMA_VERSION,
            registered_agents: BTreeMap::new(),
        }
    }
}

/// A cataloged tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRegistration {
    pub tool_id: String,
    pub display_name: String,
    pub description: String,
    pub module_path: String,
    pub class_name: String,
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub needs_identity: bool,
    pub version: String,
    pub status: RegistrationStatus,
    /// Public address, populated when `needs_identity` is set.
    #[serde(default)]
    pub identity: Option<String>,
}

/// Persistent tools registry document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsRegistryDoc {
    pub tools_schema_version: u32,
    pub registered_tools: BTreeMap<String, ToolRegistration>,
}

impl Default for ToolsRegistryDoc {
    fn default() -> Self {
        Self {
            tools_schema_version: TOOLS_SCHEMA_VERSION,
            registered_tools: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_payload_literal() {
        assert_eq!(
            AgentRegistration::signature_payload("test_agent_1"),
            "agent_registration:test_agent_1"
        );
    }

    #[test]
    fn test_admissibility_requires_enabled_and_identity() {
        let mut reg = AgentRegistration::new("a", "worker", "d");
        assert!(!reg.is_admissible(), "no identity yet");

        reg.public_address = Some("0xabc".into());
        assert!(reg.is_admissible());

        reg.enabled = false;
        assert!(!reg.is_admissible(), "disabled agents are denied");

        reg.enabled = true;
        reg.status = RegistrationStatus::Disabled;
        assert!(!reg.is_admissible(), "status disabled also denies");

        reg.status = RegistrationStatus::Registered;
        reg.public_address = Some(String::new());
        assert!(!reg.is_admissible(), "empty address is no identity");
    }
}
