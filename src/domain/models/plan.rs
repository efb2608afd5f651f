//! BDI intentions: actions and plans.
//!
//! A plan is a linear sequence of actions committed for one goal. Plans are
//! immutable once committed; replanning supersedes the whole plan. Actions
//! are dispatched by name through the executor's handler registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Per-action safety classification.
///
/// `Critical` actions must be preceded in the plan by a rollback-planning
/// action; plan validation enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Low,
    Standard,
    High,
    Critical,
}

impl Default for SafetyLevel {
    fn default() -> Self {
        Self::Standard
    }
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Standard => "standard",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Action discriminator.
///
/// The built-in set covers the universal actions every BDI instance
/// understands; anything else is `Custom` and resolves against handlers
/// registered at runtime (e.g. Mastermind's agent-lifecycle actions).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    ReadFile,
    WriteFile,
    ExecuteCommand,
    GenerateText,
    GenerateCode,
    UpdateBelief,
    QueryBelief,
    DelegateGoal,
    InvokeAudit,
    PlanRollback,
    NoOp,
    Custom(String),
}

impl ActionType {
    /// Canonical wire name (SCREAMING_SNAKE, as planners emit them).
    pub fn name(&self) -> String {
        match self {
            Self::ReadFile => "READ_FILE".into(),
            Self::WriteFile => "WRITE_FILE".into(),
            Self::ExecuteCommand => "EXECUTE_COMMAND".into(),
            Self::GenerateText => "GENERATE_TEXT".into(),
            Self::GenerateCode => "GENERATE_CODE".into(),
            Self::UpdateBelief => "UPDATE_BELIEF".into(),
            Self::QueryBelief => "QUERY_BELIEF".into(),
            Self::DelegateGoal => "DELEGATE_GOAL".into(),
            Self::InvokeAudit => "INVOKE_AUDIT".into(),
            Self::PlanRollback => "PLAN_ROLLBACK".into(),
            Self::NoOp => "NO_OP".into(),
            Self::Custom(name) => name.clone(),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "READ_FILE" => Self::ReadFile,
            "WRITE_FILE" => Self::WriteFile,
            "EXECUTE_COMMAND" => Self::ExecuteCommand,
            "GENERATE_TEXT" => Self::GenerateText,
            "GENERATE_CODE" => Self::GenerateCode,
            "UPDATE_BELIEF" => Self::UpdateBelief,
            "QUERY_BELIEF" => Self::QueryBelief,
            "DELEGATE_GOAL" => Self::DelegateGoal,
            "INVOKE_AUDIT" => Self::InvokeAudit,
            "PLAN_ROLLBACK" => Self::PlanRollback,
            "NO_OP" => Self::NoOp,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl From<ActionType> for String {
    fn from(t: ActionType) -> Self {
        t.name()
    }
}

/// Validation criteria attached to an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationCriteria {
    /// Whether a failure of this action invalidates the plan and triggers
    /// a replan instead of failing the goal outright.
    #[serde(default)]
    pub rollback_required: bool,
    /// Free-form acceptance criteria recorded with the action.
    #[serde(default)]
    pub criteria: Vec<String>,
}

/// Metadata attached to every planned action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMeta {
    pub id: Uuid,
    #[serde(default)]
    pub safety_level: SafetyLevel,
    /// Abstract cost estimate used for reporting only.
    #[serde(default)]
    pub estimated_cost: f64,
    /// Execution budget; the executor times out at this plus a fixed grace.
    #[serde(default = "default_duration")]
    pub estimated_duration_seconds: u64,
    /// Ids of actions that must precede this one.
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
    #[serde(default)]
    pub validation: ValidationCriteria,
}

fn default_duration() -> u64 {
    30
}

impl Default for ActionMeta {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            safety_level: SafetyLevel::default(),
            estimated_cost: 0.0,
            estimated_duration_seconds: default_duration(),
            dependencies: Vec::new(),
            validation: ValidationCriteria::default(),
        }
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub meta: ActionMeta,
}

impl Action {
    pub fn new(action_type: ActionType, params: Value) -> Self {
        Self {
            action_type,
            params,
            meta: ActionMeta::default(),
        }
    }

    pub fn with_safety(mut self, level: SafetyLevel) -> Self {
        self.meta.safety_level = level;
        self
    }

    pub fn with_rollback_required(mut self, required: bool) -> Self {
        self.meta.validation.rollback_required = required;
        self
    }

    pub fn with_estimated_duration(mut self, seconds: u64) -> Self {
        self.meta.estimated_duration_seconds = seconds;
        self
    }
}

/// Why a plan failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanValidationError {
    #[error("Plan is empty")]
    Empty,

    #[error("Action '{0}' is not in the action catalog")]
    UnknownAction(String),

    #[error("Action '{0}' params must be a JSON object")]
    InvalidParams(String),

    #[error("Critical action '{0}' has no preceding rollback-planning action")]
    UnprotectedCriticalAction(String),
}

/// A committed linear sequence of actions for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub actions: Vec<Action>,
    /// Index of the next action to execute.
    pub cursor: usize,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(goal_id: Uuid, actions: Vec<Action>) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal_id,
            actions,
            cursor: 0,
            created_at: Utc::now(),
        }
    }

    /// Validate against the executor's action catalog.
    ///
    /// Rejects empty plans, actions outside the catalog, non-object params,
    /// and critical actions with no earlier `PLAN_ROLLBACK` step.
    pub fn validate<'a, I>(&self, catalog: I) -> Result<(), PlanValidationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.actions.is_empty() {
            return Err(PlanValidationError::Empty);
        }
        let known: std::collections::HashSet<&str> = catalog.into_iter().collect();
        let mut rollback_seen = false;
        for action in &self.actions {
            let name = action.action_type.name();
            if !known.contains(name.as_str()) {
                return Err(PlanValidationError::UnknownAction(name));
            }
            if !action.params.is_null() && !action.params.is_object() {
                return Err(PlanValidationError::InvalidParams(name));
            }
            if action.meta.safety_level == SafetyLevel::Critical && !rollback_seen {
                return Err(PlanValidationError::UnprotectedCriticalAction(name));
            }
            if action.action_type == ActionType::PlanRollback {
                rollback_seen = true;
            }
        }
        Ok(())
    }

    /// The action at the cursor, if the plan is not exhausted.
    pub fn current(&self) -> Option<&Action> {
        self.actions.get(self.cursor)
    }

    /// Advance past the current action.
    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Whether every action has been executed.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CATALOG: &[&str] = &[
        "READ_FILE",
        "WRITE_FILE",
        "EXECUTE_COMMAND",
        "PLAN_ROLLBACK",
        "NO_OP",
    ];

    #[test]
    fn test_action_type_wire_names() {
        assert_eq!(ActionType::ReadFile.name(), "READ_FILE");
        assert_eq!(ActionType::from_name("WRITE_FILE"), ActionType::WriteFile);
        assert_eq!(
            ActionType::from_name("CREATE_AGENT"),
            ActionType::Custom("CREATE_AGENT".into())
        );
    }

    #[test]
    fn test_action_type_serde_round_trip() {
        let a = Action::new(ActionType::WriteFile, json!({"path": "x"}));
        let s = serde_json::to_string(&a).unwrap();
        assert!(s.contains("\"WRITE_FILE\""));
        let back: Action = serde_json::from_str(&s).unwrap();
        assert_eq!(back.action_type, ActionType::WriteFile);
    }

    #[test]
    fn test_empty_plan_rejected() {
        let plan = Plan::new(Uuid::new_v4(), vec![]);
        assert_eq!(
            plan.validate(CATALOG.iter().copied()),
            Err(PlanValidationError::Empty)
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        let plan = Plan::new(
            Uuid::new_v4(),
            vec![Action::new(ActionType::Custom("FLY".into()), json!({}))],
        );
        assert_eq!(
            plan.validate(CATALOG.iter().copied()),
            Err(PlanValidationError::UnknownAction("FLY".into()))
        );
    }

    #[test]
    fn test_non_object_params_rejected() {
        let plan = Plan::new(
            Uuid::new_v4(),
            vec![Action::new(ActionType::NoOp, json!([1, 2]))],
        );
        assert_eq!(
            plan.validate(CATALOG.iter().copied()),
            Err(PlanValidationError::InvalidParams("NO_OP".into()))
        );
    }

    #[test]
    fn test_critical_requires_prior_rollback() {
        let critical =
            Action::new(ActionType::ExecuteCommand, json!({})).with_safety(SafetyLevel::Critical);
        let plan = Plan::new(Uuid::new_v4(), vec![critical.clone()]);
        assert!(matches!(
            plan.validate(CATALOG.iter().copied()),
            Err(PlanValidationError::UnprotectedCriticalAction(_))
        ));

        let protected = Plan::new(
            Uuid::new_v4(),
            vec![Action::new(ActionType::PlanRollback, json!({})), critical],
        );
        assert_eq!(protected.validate(CATALOG.iter().copied()), Ok(()));
    }

    #[test]
    fn test_cursor_advance() {
        let mut plan = Plan::new(
            Uuid::new_v4(),
            vec![
                Action::new(ActionType::NoOp, json!({})),
                Action::new(ActionType::NoOp, json!({})),
            ],
        );
        assert!(!plan.is_exhausted());
        assert!(plan.current().is_some());
        plan.advance();
        plan.advance();
        assert!(plan.is_exhausted());
        assert!(plan.current().is_none());
    }
}
