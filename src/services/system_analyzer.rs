//! System analysis: ranked improvement suggestions.
//!
//! Prompts the text generator with a directive hint plus registry summaries
//! and expects strict JSON back. Any generation or validation failure
//! degrades to an empty suggestion list; the caller treats that as "nothing
//! to do", never as an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::ports::{GenerationOptions, TextGenerator};

/// One proposal emitted by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementSuggestion {
    pub description: String,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub target_component: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    improvement_suggestions: Vec<ImprovementSuggestion>,
}

/// Codebase/system analyzer backed by the opaque text generator.
pub struct SystemAnalyzer {
    generator: Arc<dyn TextGenerator>,
}

impl SystemAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Produce ranked suggestions for a directive. Highest priority first;
    /// empty on any failure.
    pub async fn analyze(&self, focus_hint: &str, system_context: &Value) -> Vec<ImprovementSuggestion> {
        let prompt = format!(
            "As a strategic system analyzer, propose concrete improvements for the \
             following directive.\nDirective: {focus_hint}\nSystem context: {system_context}\n\
             Respond ONLY with JSON: {{\"improvement_suggestions\": [{{\"description\": \"...\", \
             \"priority\": 0-10, \"target_component\": \"...\"}}]}}"
        );

        let response = match self
            .generator
            .generate(&prompt, GenerationOptions::json())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "System analysis generation failed");
                return Vec::new();
            }
        };

        match serde_json::from_str::<AnalysisResponse>(&response) {
            Ok(parsed) => {
                let mut suggestions = parsed.improvement_suggestions;
                suggestions.sort_by(|a, b| b.priority.cmp(&a.priority));
                debug!(count = suggestions.len(), "System analysis complete");
                suggestions
            }
            Err(e) => {
                warn!(error = %e, "System analysis response failed validation");
                Vec::new()
            }
        }
    }
}
