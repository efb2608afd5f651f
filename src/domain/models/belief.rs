//! Belief domain model.
//!
//! A belief is a single dotted-key fact with provenance: value, confidence,
//! source, and timestamps. Beliefs live in the shared
//! [`BeliefSystem`](crate::services::BeliefSystem) and are copied out on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Origin of a belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeliefSource {
    Perception,
    Communication,
    Inference,
    SelfAnalysis,
    ExternalInput,
    Default,
    Learned,
    Derived,
}

impl Default for BeliefSource {
    fn default() -> Self {
        Self::Default
    }
}

impl BeliefSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Perception => "perception",
            Self::Communication => "communication",
            Self::Inference => "inference",
            Self::SelfAnalysis => "self_analysis",
            Self::ExternalInput => "external_input",
            Self::Default => "default",
            Self::Learned => "learned",
            Self::Derived => "derived",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "perception" => Some(Self::Perception),
            "communication" => Some(Self::Communication),
            "inference" => Some(Self::Inference),
            "self_analysis" => Some(Self::SelfAnalysis),
            "external_input" => Some(Self::ExternalInput),
            "default" | "default_value" => Some(Self::Default),
            "learned" | "learned_experience" => Some(Self::Learned),
            "derived" => Some(Self::Derived),
            _ => None,
        }
    }
}

/// A single belief with provenance metadata.
///
/// Confidence is clamped to `[0.0, 1.0]` on every write. `created_at` is
/// preserved across updates; `updated_at` moves forward on each write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    /// The belief's value (arbitrary JSON).
    pub value: Value,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Where this belief came from.
    pub source: BeliefSource,
    /// When the belief was first recorded.
    pub created_at: DateTime<Utc>,
    /// When the belief was last written.
    pub updated_at: DateTime<Utc>,
}

impl Belief {
    /// Create a new belief. Confidence is clamped into `[0.0, 1.0]`.
    pub fn new(value: Value, confidence: f64, source: BeliefSource) -> Self {
        let now = Utc::now();
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite value, confidence, and source. `created_at` is preserved;
    /// `updated_at` is set to now and never moves backwards.
    pub fn update(&mut self, value: Value, confidence: f64, source: BeliefSource) {
        self.value = value;
        self.confidence = confidence.clamp(0.0, 1.0);
        self.source = source;
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confidence_clamped_on_create() {
        let b = Belief::new(json!("v"), 1.7, BeliefSource::Perception);
        assert_eq!(b.confidence, 1.0);

        let b = Belief::new(json!("v"), -0.2, BeliefSource::Perception);
        assert_eq!(b.confidence, 0.0);

        let b = Belief::new(json!("v"), 0.42, BeliefSource::Perception);
        assert_eq!(b.confidence, 0.42);
    }

    #[test]
    fn test_update_preserves_created_at() {
        let mut b = Belief::new(json!(1), 0.5, BeliefSource::Default);
        let created = b.created_at;
        b.update(json!(2), 0.9, BeliefSource::Inference);
        assert_eq!(b.created_at, created);
        assert_eq!(b.value, json!(2));
        assert_eq!(b.source, BeliefSource::Inference);
        assert!(b.updated_at >= created);
    }

    #[test]
    fn test_source_round_trip() {
        for s in [
            BeliefSource::Perception,
            BeliefSource::Communication,
            BeliefSource::Inference,
            BeliefSource::SelfAnalysis,
            BeliefSource::ExternalInput,
            BeliefSource::Default,
            BeliefSource::Learned,
            BeliefSource::Derived,
        ] {
            assert_eq!(BeliefSource::from_str(s.as_str()), Some(s));
        }
        assert_eq!(BeliefSource::from_str("bogus"), None);
    }
}
