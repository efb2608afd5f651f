//! Structured command results.
//!
//! Every CLI verb yields one JSON envelope on stdout: a `status` field, a
//! human-readable `message`, optional `data`, and an `error_type` for
//! failures. Exit codes: 0 success, 1 handled failure, 2 configuration or
//! environment error.

use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;
use serde_json::Value;

use crate::domain::models::{AgentRegistration, BacklogItem};

/// Envelope status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Success,
    Failure,
    Error,
}

/// The JSON result of one command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: CommandStatus::Success,
            message: message.into(),
            data,
            error_type: None,
        }
    }

    pub fn failure(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            data: None,
            error_type: Some(error_type.into()),
        }
    }

    pub fn error(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Error,
            message: message.into(),
            data: None,
            error_type: Some(error_type.into()),
        }
    }

    /// Process exit code for this result.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            CommandStatus::Success => 0,
            CommandStatus::Failure => 1,
            CommandStatus::Error => 2,
        }
    }

    /// Print the envelope to stdout.
    pub fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{json}"),
            Err(_) => println!("{{\"status\": \"ERROR\", \"message\": \"serialization failed\"}}"),
        }
    }
}

/// Render the backlog as a terminal table.
pub fn backlog_table(items: &[BacklogItem]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["id", "priority", "status", "component", "description"]);
    for item in items {
        table.add_row(vec![
            item.id.to_string(),
            item.priority.to_string(),
            item.status.as_str().to_string(),
            item.target_component.clone(),
            truncate(&item.description, 60),
        ]);
    }
    table
}

/// Render the agent registry as a terminal table.
pub fn agents_table(agents: &[AgentRegistration]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["agent_id", "type", "status", "enabled", "address"]);
    for agent in agents {
        table.add_row(vec![
            agent.agent_id.clone(),
            agent.agent_type.clone(),
            agent.status.as_str().to_string(),
            agent.enabled.to_string(),
            agent.public_address.clone().unwrap_or_default(),
        ]);
    }
    table
}

fn truncate(s: &str, max: usize) -> String {
    // Cut on a char boundary; a byte index would split multibyte input.
    s.char_indices()
        .nth(max)
        .map_or_else(|| s.to_string(), |(i, _)| format!("{}...", &s[..i]))
}
