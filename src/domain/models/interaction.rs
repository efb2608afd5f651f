//! Coordinator interactions.
//!
//! An interaction is a typed, stateful request processed by the Coordinator.
//! Lifecycle: `Pending -> InProgress -> Completed | Failed`; immutable after
//! a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of request routed through the Coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    SystemAnalysis,
    ComponentImprovement,
    UserQuery,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemAnalysis => "system_analysis",
            Self::ComponentImprovement => "component_improvement",
            Self::UserQuery => "user_query",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "system_analysis" => Some(Self::SystemAnalysis),
            "component_improvement" => Some(Self::ComponentImprovement),
            "user_query" => Some(Self::UserQuery),
            _ => None,
        }
    }
}

/// Processing state of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl InteractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A typed request with its lifecycle state and result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub interaction_type: InteractionType,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    pub status: InteractionStatus,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Interaction {
    pub fn new(
        interaction_type: InteractionType,
        content: impl Into<String>,
        metadata: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            interaction_type,
            content: content.into(),
            metadata,
            status: InteractionStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark in progress. No-op once terminal.
    pub fn begin(&mut self) {
        if !self.status.is_terminal() {
            self.status = InteractionStatus::InProgress;
        }
    }

    /// Terminalize with a successful result.
    pub fn complete(&mut self, result: Value) {
        if self.status.is_terminal() {
            return;
        }
        self.status = InteractionStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// Terminalize with an error.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = InteractionStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lifecycle_pending_to_completed() {
        let mut i = Interaction::new(InteractionType::UserQuery, "hi", json!({}));
        assert_eq!(i.status, InteractionStatus::Pending);
        i.begin();
        assert_eq!(i.status, InteractionStatus::InProgress);
        i.complete(json!({"answer": 42}));
        assert_eq!(i.status, InteractionStatus::Completed);
        assert!(i.completed_at.is_some());
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        let mut i = Interaction::new(InteractionType::UserQuery, "hi", json!({}));
        i.fail("boom");
        let completed_at = i.completed_at;

        i.complete(json!("later"));
        assert_eq!(i.status, InteractionStatus::Failed);
        assert_eq!(i.result, None);
        assert_eq!(i.completed_at, completed_at);

        i.begin();
        assert_eq!(i.status, InteractionStatus::Failed);
    }

    #[test]
    fn test_type_round_trip() {
        for t in [
            InteractionType::SystemAnalysis,
            InteractionType::ComponentImprovement,
            InteractionType::UserQuery,
        ] {
            assert_eq!(InteractionType::from_str(t.as_str()), Some(t));
        }
    }
}
