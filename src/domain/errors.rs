//! Domain errors for the mindx orchestration system.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur across the decision hierarchy.
#[derive(Debug, Error)]
pub enum MindxError {
    // Identity errors
    #[error("No key sealed for entity: {0}")]
    KeyNotFound(String),

    #[error("Signing failed for entity {entity_id}: {reason}")]
    SigningFailed { entity_id: String, reason: String },

    #[error("Signature verification mismatch for address {0}")]
    VerificationMismatch(String),

    #[error("Key store I/O error: {0}")]
    KeyStoreIo(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    // Admission errors
    #[error("Challenge for '{0}' is expired or absent")]
    ChallengeInvalid(String),

    #[error("Agent '{0}' is not admissible per the registry")]
    RegistryMiss(String),

    #[error("Workspace path does not exist or is not a directory: {0}")]
    WorkspaceMissing(String),

    // Planning errors
    #[error("Text generator returned no text")]
    EmptyGeneration,

    #[error("Generated output is not valid JSON: {0}")]
    GenerationParse(String),

    #[error("Plan failed validation: {0}")]
    PlanInvalid(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    // Execution errors
    #[error("Action '{action}' timed out after {seconds}s")]
    ActionTimeout { action: String, seconds: u64 },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    // Coordination errors
    #[error("No handler for interaction type: {0}")]
    HandlerAbsent(String),

    #[error("Backlog item not found: {0}")]
    BacklogItemNotFound(Uuid),

    #[error("Campaign '{0}' already has an in-flight backlog item")]
    DuplicateCampaignItem(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    // Resource errors
    #[error("Persistence I/O error: {0}")]
    PersistenceIo(String),

    #[error("Snapshot corrupt: {0}")]
    SnapshotCorrupt(String),

    // Loop errors
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Cognitive loop failed: {0}")]
    LoopFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type MindxResult<T> = Result<T, MindxError>;

impl From<serde_json::Error> for MindxError {
    fn from(err: serde_json::Error) -> Self {
        MindxError::GenerationParse(err.to_string())
    }
}

impl From<std::io::Error> for MindxError {
    fn from(err: std::io::Error) -> Self {
        MindxError::PersistenceIo(err.to_string())
    }
}

impl MindxError {
    /// Short machine-readable kind, used in command envelopes and the
    /// `HALTED_EXCEPTION:<kind>` BDI terminal message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyNotFound(_) => "KEY_NOT_FOUND",
            Self::SigningFailed { .. } => "SIGNING_FAILED",
            Self::VerificationMismatch(_) => "VERIFICATION_MISMATCH",
            Self::KeyStoreIo(_) => "KEY_STORE_IO",
            Self::Crypto(_) => "CRYPTO",
            Self::ChallengeInvalid(_) => "CHALLENGE_INVALID",
            Self::RegistryMiss(_) => "REGISTRY_MISS",
            Self::WorkspaceMissing(_) => "WORKSPACE_MISSING",
            Self::EmptyGeneration => "EMPTY_GENERATION",
            Self::GenerationParse(_) => "GENERATION_PARSE",
            Self::PlanInvalid(_) => "PLAN_INVALID",
            Self::UnknownAction(_) => "UNKNOWN_ACTION",
            Self::ActionTimeout { .. } => "TIMEOUT",
            Self::ToolNotFound(_) => "TOOL_NOT_FOUND",
            Self::ExecutionFailed(_) => "EXECUTION_FAILED",
            Self::HandlerAbsent(_) => "HANDLER_ABSENT",
            Self::BacklogItemNotFound(_) => "BACKLOG_ITEM_NOT_FOUND",
            Self::DuplicateCampaignItem(_) => "DUPLICATE_CAMPAIGN_ITEM",
            Self::AgentNotFound(_) => "AGENT_NOT_FOUND",
            Self::PersistenceIo(_) => "PERSISTENCE_IO",
            Self::SnapshotCorrupt(_) => "SNAPSHOT_CORRUPT",
            Self::Cancelled => "CANCELLED",
            Self::LoopFailed(_) => "LOOP_FAILED",
            Self::Config(_) => "CONFIG",
        }
    }
}
