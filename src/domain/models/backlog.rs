//! Improvement backlog items.
//!
//! The Coordinator keeps the backlog ordered by `(priority desc,
//! created_at asc)`. Priority is clamped to `[0, 10]` on construction.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default priority used when the caller supplies none.
pub const DEFAULT_BACKLOG_PRIORITY: u8 = 5;

/// Maximum backlog priority.
pub const MAX_BACKLOG_PRIORITY: u8 = 10;

/// Lifecycle of a backlog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacklogStatus {
    Pending,
    InProgress,
    Done,
    Rejected,
}

impl BacklogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Rejected)
    }
}

/// A queued improvement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: Uuid,
    pub description: String,
    /// Priority in `[0, 10]`; higher runs first.
    pub priority: u8,
    pub status: BacklogStatus,
    /// Who enqueued this (user id, campaign id, agent id).
    pub source: String,
    /// Component the improvement targets.
    pub target_component: String,
    pub created_at: DateTime<Utc>,
}

impl BacklogItem {
    pub fn new(
        description: impl Into<String>,
        priority: u8,
        source: impl Into<String>,
        target_component: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            priority: priority.min(MAX_BACKLOG_PRIORITY),
            status: BacklogStatus::Pending,
            source: source.into(),
            target_component: target_component.into(),
            created_at: Utc::now(),
        }
    }

    /// Dequeue ordering: highest priority first, FIFO within a priority.
    pub fn queue_cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(self.created_at.cmp(&other.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_clamped() {
        let item = BacklogItem::new("x", 99, "test", "core");
        assert_eq!(item.priority, MAX_BACKLOG_PRIORITY);
    }

    #[test]
    fn test_queue_cmp_priority_then_fifo() {
        let a = BacklogItem::new("A", 3, "t", "c");
        let mut b = BacklogItem::new("B", 7, "t", "c");
        let mut c = BacklogItem::new("C", 7, "t", "c");
        // Force a deterministic FIFO relationship.
        b.created_at = a.created_at;
        c.created_at = a.created_at + chrono::Duration::milliseconds(1);

        let mut items = vec![a.clone(), b.clone(), c.clone()];
        items.sort_by(BacklogItem::queue_cmp);

        let order: Vec<&str> = items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }
}
