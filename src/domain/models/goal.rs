//! BDI goals (desires).
//!
//! A BDI instance holds an ordered set of goals; at most one is primary.
//! Setting a new primary goal supersedes the old one and invalidates its
//! plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    New,
    Active,
    Achieved,
    Failed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Achieved => "achieved",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Achieved | Self::Failed)
    }
}

/// A desire the BDI executor works toward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub description: String,
    pub priority: u8,
    pub is_primary: bool,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(description: impl Into<String>, priority: u8, is_primary: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            priority,
            is_primary,
            status: GoalStatus::New,
            created_at: Utc::now(),
        }
    }
}
