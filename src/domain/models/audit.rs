//! Recurring audit campaign schedules.
//!
//! The Audit Coordinator ticks over these and enqueues improvement backlog
//! items whenever `next_run_at` has passed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::backlog::MAX_BACKLOG_PRIORITY;

/// A recurring audit campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCampaignSchedule {
    pub campaign_id: String,
    /// What is being audited (e.g. "security", "performance").
    pub audit_scope: String,
    pub target_components: Vec<String>,
    /// Hours between runs.
    pub interval_hours: i64,
    /// Backlog priority for injected items, in `[0, 10]`.
    pub priority: u8,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: DateTime<Utc>,
}

impl AuditCampaignSchedule {
    pub fn new(
        campaign_id: impl Into<String>,
        audit_scope: impl Into<String>,
        target_components: Vec<String>,
        interval_hours: i64,
        priority: u8,
    ) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            audit_scope: audit_scope.into(),
            target_components,
            interval_hours,
            priority: priority.min(MAX_BACKLOG_PRIORITY),
            last_run_at: None,
            next_run_at: Utc::now(),
        }
    }

    /// Whether the campaign is due as of `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run_at <= now
    }

    /// Record a run at `now` and push the next one out by the interval.
    pub fn mark_run(&mut self, now: DateTime<Utc>) {
        self.last_run_at = Some(now);
        self.next_run_at = now + Duration::hours(self.interval_hours);
    }

    /// The directive injected into the backlog for this campaign.
    pub fn directive(&self) -> String {
        format!(
            "Audit {} across {}",
            self.audit_scope,
            self.target_components.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_schedule_is_immediately_due() {
        let s = AuditCampaignSchedule::new("c1", "security", vec!["core".into()], 24, 7);
        assert!(s.is_due(Utc::now()));
    }

    #[test]
    fn test_priority_clamped_to_backlog_domain() {
        let s = AuditCampaignSchedule::new("c1", "security", vec!["core".into()], 24, 99);
        assert_eq!(s.priority, MAX_BACKLOG_PRIORITY);
    }

    #[test]
    fn test_mark_run_pushes_next_run() {
        let mut s = AuditCampaignSchedule::new("c1", "security", vec!["core".into()], 24, 7);
        let now = Utc::now();
        s.mark_run(now);
        assert_eq!(s.last_run_at, Some(now));
        assert_eq!(s.next_run_at, now + Duration::hours(24));
        assert!(!s.is_due(now));
        assert!(s.is_due(now + Duration::hours(24)));
    }

    #[test]
    fn test_directive_names_scope_and_components() {
        let s = AuditCampaignSchedule::new(
            "c1",
            "security",
            vec!["core".into(), "tools".into()],
            24,
            7,
        );
        assert_eq!(s.directive(), "Audit security across core, tools");
    }
}
