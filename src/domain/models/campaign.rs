//! Mastermind campaign records.
//!
//! Every evolution or deployment run appends one record to the campaign
//! history; the history file is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Success,
    FailureOrIncomplete,
    Error,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::FailureOrIncomplete => "FAILURE_OR_INCOMPLETE",
            Self::Error => "ERROR",
        }
    }
}

/// What kind of campaign was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    Evolution,
    Deployment,
}

/// One Mastermind-directed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub run_id: String,
    pub kind: CampaignKind,
    pub directive: String,
    /// Description of the top analyzer suggestion acted on, when any.
    #[serde(default)]
    pub top_suggestion: Option<String>,
    /// The BDI executor's final message verbatim.
    #[serde(default)]
    pub bdi_final_message: Option<String>,
    pub overall_status: CampaignStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Outcome returned to the caller of a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignOutcome {
    pub overall_campaign_status: CampaignStatus,
    pub message: String,
    #[serde(default)]
    pub run_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_screaming() {
        let s = serde_json::to_string(&CampaignStatus::FailureOrIncomplete).unwrap();
        assert_eq!(s, "\"FAILURE_OR_INCOMPLETE\"");
        let s = serde_json::to_string(&CampaignStatus::Success).unwrap();
        assert_eq!(s, "\"SUCCESS\"");
    }
}
