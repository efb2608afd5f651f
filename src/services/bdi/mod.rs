//! Belief-Desire-Intention executor.
//!
//! Consumes one goal at a time: plans with the text generator, validates
//! the plan against the action catalog, executes actions with per-action
//! timeouts, and reports a terminal message whose prefix encodes the
//! outcome. A BDI instance is owned by its invoker (AGInt or Mastermind)
//! and runs sequentially.

pub mod actions;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::config::BdiConfig;
use crate::domain::models::{
    Action, ActionType, BeliefSource, Goal, GoalStatus, Plan, SafetyLevel,
};
use crate::domain::ports::{GenerationOptions, TextGenerator};
use crate::services::{BeliefSystem, MemoryAgent};

pub use actions::{ActionFailure, ActionHandler, ActionResult};

/// Terminal message prefixes returned by [`BdiAgent::run`].
pub const COMPLETED_GOAL_ACHIEVED: &str = "COMPLETED_GOAL_ACHIEVED";
pub const FAILED_PLAN_EXECUTION: &str = "FAILED_PLAN_EXECUTION";
pub const FAILED_NO_PLAN: &str = "FAILED_NO_PLAN";
pub const HALTED_MAX_CYCLES: &str = "HALTED_MAX_CYCLES";
pub const HALTED_EXCEPTION: &str = "HALTED_EXCEPTION";

/// Executor status as reported by [`BdiAgent::get_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BdiStatus {
    Idle,
    Running,
    CompletedGoalAchieved,
    FailedPlanExecution,
    FailedNoPlan,
    HaltedMaxCycles,
    HaltedException,
}

/// Outcome of the most recent action, fed into the next cycle's beliefs.
#[derive(Debug, Clone)]
struct ActionOutcome {
    action_name: String,
    success: bool,
    result: Value,
}

/// Shape the planner's JSON is parsed from.
#[derive(Debug, Deserialize)]
struct PlannedStep {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    safety_level: Option<SafetyLevel>,
    #[serde(default)]
    estimated_duration_seconds: Option<u64>,
    #[serde(default)]
    rollback_required: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PlanEnvelope {
    plan: Vec<PlannedStep>,
}

/// The BDI reasoning loop over one belief domain.
pub struct BdiAgent {
    domain: String,
    belief_system: Arc<BeliefSystem>,
    memory: Arc<MemoryAgent>,
    generator: Option<Arc<dyn TextGenerator>>,
    config: BdiConfig,
    handlers: HashMap<String, ActionHandler>,
    desires: Vec<Goal>,
    current_plan: Option<Plan>,
    plan_attempts: u32,
    last_outcome: Option<ActionOutcome>,
    status: BdiStatus,
}

impl BdiAgent {
    /// Build an executor with the universal action set registered against
    /// `workspace`.
    pub fn new(
        domain: impl Into<String>,
        belief_system: Arc<BeliefSystem>,
        memory: Arc<MemoryAgent>,
        generator: Option<Arc<dyn TextGenerator>>,
        workspace: PathBuf,
        config: BdiConfig,
    ) -> Self {
        let domain = domain.into();
        let mut agent = Self {
            domain: domain.clone(),
            belief_system: belief_system.clone(),
            memory,
            generator: generator.clone(),
            config,
            handlers: HashMap::new(),
            desires: Vec::new(),
            current_plan: None,
            plan_attempts: 0,
            last_outcome: None,
            status: BdiStatus::Idle,
        };

        agent.register_action(
            ActionType::ReadFile.name(),
            actions::read_file_handler(workspace.clone()),
        );
        agent.register_action(
            ActionType::WriteFile.name(),
            actions::write_file_handler(workspace.clone()),
        );
        agent.register_action(
            ActionType::ExecuteCommand.name(),
            actions::execute_command_handler(workspace),
        );
        agent.register_action(
            ActionType::GenerateText.name(),
            actions::generate_text_handler(generator.clone()),
        );
        agent.register_action(
            ActionType::GenerateCode.name(),
            actions::generate_code_handler(generator),
        );
        agent.register_action(
            ActionType::UpdateBelief.name(),
            actions::update_belief_handler(belief_system.clone(), domain.clone()),
        );
        agent.register_action(
            ActionType::QueryBelief.name(),
            actions::query_belief_handler(belief_system.clone(), domain.clone()),
        );
        agent.register_action(
            ActionType::InvokeAudit.name(),
            actions::invoke_audit_handler(belief_system.clone(), domain.clone()),
        );
        agent.register_action(
            ActionType::PlanRollback.name(),
            actions::plan_rollback_handler(belief_system, domain),
        );
        agent.register_action(ActionType::NoOp.name(), actions::no_op_handler());
        agent
    }

    /// Register (or replace) a named action handler.
    pub fn register_action(&mut self, name: impl Into<String>, handler: ActionHandler) {
        self.handlers.insert(name.into(), handler);
    }

    /// Set a goal. A primary goal supersedes the current primary and
    /// invalidates any committed plan.
    pub fn set_goal(&mut self, description: impl Into<String>, priority: u8, is_primary: bool) {
        if is_primary {
            for goal in &mut self.desires {
                goal.is_primary = false;
            }
            self.current_plan = None;
            self.plan_attempts = 0;
        }
        self.desires.push(Goal::new(description, priority, is_primary));
    }

    /// Executor status snapshot.
    pub fn get_status(&self) -> Value {
        let current_goal = self
            .select_goal_index()
            .map(|i| self.desires[i].description.clone());
        json!({
            "status": self.status,
            "domain": self.domain,
            "current_goal": current_goal,
            "desires": self.desires.len(),
            "plan_actions": self.current_plan.as_ref().map(|p| p.actions.len()),
            "plan_cursor": self.current_plan.as_ref().map(|p| p.cursor),
            "plan_attempts": self.plan_attempts,
        })
    }

    /// Run up to `max_cycles` reasoning cycles.
    ///
    /// Returns a message whose prefix is one of
    /// [`COMPLETED_GOAL_ACHIEVED`], [`FAILED_PLAN_EXECUTION`],
    /// [`FAILED_NO_PLAN`], [`HALTED_MAX_CYCLES`], or
    /// `HALTED_EXCEPTION:<kind>`.
    pub async fn run(&mut self, max_cycles: u32) -> String {
        self.status = BdiStatus::Running;
        for cycle in 0..max_cycles {
            debug!(domain = %self.domain, cycle, "BDI cycle start");

            // 1. Fold the previous action's outcome into beliefs.
            self.absorb_percepts().await;

            // 2. Select a goal; none left means everything is achieved.
            let Some(goal_index) = self.select_goal_index() else {
                self.status = BdiStatus::CompletedGoalAchieved;
                return format!("{COMPLETED_GOAL_ACHIEVED}: No remaining goals.");
            };
            self.desires[goal_index].status = GoalStatus::Active;
            let goal_id = self.desires[goal_index].id;
            let goal_description = self.desires[goal_index].description.clone();

            // 3. Plan when no committed plan exists.
            if self.current_plan.is_none() {
                match self.make_plan(goal_id, &goal_description).await {
                    Ok(plan) => {
                        self.plan_attempts += 1;
                        self.trace(
                            "bdi_plan_committed",
                            json!({"goal": goal_description, "actions": plan.actions.len()}),
                        )
                        .await;
                        self.current_plan = Some(plan);
                    }
                    Err(reason) => {
                        self.plan_attempts += 1;
                        warn!(domain = %self.domain, reason, "Planning failed");
                        if self.plan_attempts >= self.config.max_plan_attempts {
                            self.desires[goal_index].status = GoalStatus::Failed;
                            self.status = BdiStatus::FailedNoPlan;
                            return format!("{FAILED_NO_PLAN}: {reason}");
                        }
                        continue;
                    }
                }
            }

            // 4. Execute the next action.
            let Some(action) = self.current_plan.as_ref().and_then(Plan::current).cloned()
            else {
                // Exhausted plan: the goal is achieved. Primary completion
                // ends the run; secondary goals hand control back to the
                // selector.
                self.desires[goal_index].status = GoalStatus::Achieved;
                self.current_plan = None;
                if self.desires[goal_index].is_primary {
                    self.status = BdiStatus::CompletedGoalAchieved;
                    return format!(
                        "{COMPLETED_GOAL_ACHIEVED}: Goal '{goal_description}' achieved."
                    );
                }
                continue;
            };

            let action_name = action.action_type.name();
            let outcome = match self.execute_action(action.clone()).await {
                Ok(result) => {
                    self.trace(
                        "bdi_action_succeeded",
                        json!({"action": &action_name, "result": &result}),
                    )
                    .await;
                    ActionOutcome {
                        action_name: action_name.clone(),
                        success: true,
                        result,
                    }
                }
                Err(failure) => {
                    self.trace(
                        "bdi_action_failed",
                        json!({"action": &action_name, "failure": &failure}),
                    )
                    .await;
                    if failure.kind == "UNKNOWN_ACTION" {
                        self.status = BdiStatus::HaltedException;
                        return format!(
                            "{HALTED_EXCEPTION}:{}: {}",
                            failure.kind, failure.message
                        );
                    }
                    self.last_outcome = Some(ActionOutcome {
                        action_name: action_name.clone(),
                        success: false,
                        result: json!({"error": failure.clone()}),
                    });

                    // 5. Replan or terminate, per the action's contract.
                    if action.meta.validation.rollback_required
                        && self.plan_attempts < self.config.max_plan_attempts
                    {
                        info!(domain = %self.domain, action = %action_name, "Invalidating plan for replan");
                        self.current_plan = None;
                        continue;
                    }
                    self.desires[goal_index].status = GoalStatus::Failed;
                    self.status = BdiStatus::FailedPlanExecution;
                    return format!(
                        "{FAILED_PLAN_EXECUTION}: Action '{action_name}' failed ({}): {}",
                        failure.kind, failure.message
                    );
                }
            };

            self.last_outcome = Some(outcome);
            if let Some(plan) = self.current_plan.as_mut() {
                plan.advance();
                if plan.is_exhausted() {
                    self.desires[goal_index].status = GoalStatus::Achieved;
                    self.current_plan = None;
                    if self.desires[goal_index].is_primary {
                        self.status = BdiStatus::CompletedGoalAchieved;
                        return format!(
                            "{COMPLETED_GOAL_ACHIEVED}: Goal '{goal_description}' achieved."
                        );
                    }
                }
            }
        }

        self.status = BdiStatus::HaltedMaxCycles;
        format!("{HALTED_MAX_CYCLES}: Stopped after {max_cycles} cycles.")
    }

    /// Highest-priority non-terminal goal, primary first.
    fn select_goal_index(&self) -> Option<usize> {
        let non_terminal = |g: &&(usize, &Goal)| !g.1.status.is_terminal();
        let indexed: Vec<(usize, &Goal)> = self.desires.iter().enumerate().collect();
        indexed
            .iter()
            .filter(non_terminal)
            .find(|(_, g)| g.is_primary)
            .or_else(|| {
                indexed
                    .iter()
                    .filter(non_terminal)
                    .max_by_key(|(_, g)| g.priority)
            })
            .map(|(i, _)| *i)
    }

    async fn absorb_percepts(&mut self) {
        let Some(outcome) = self.last_outcome.take() else {
            return;
        };
        self.belief_system
            .add_belief(
                &format!("{}.percept.last_action_success", self.domain),
                json!(outcome.success),
                1.0,
                BeliefSource::Perception,
            )
            .await;
        self.belief_system
            .add_belief(
                &format!("{}.percept.last_action_result", self.domain),
                json!({"action": outcome.action_name, "result": outcome.result}),
                1.0,
                BeliefSource::Perception,
            )
            .await;
    }

    async fn make_plan(&self, goal_id: Uuid, goal_description: &str) -> Result<Plan, String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| "Text generator not configured".to_string())?;

        let catalog: Vec<String> = {
            let mut names: Vec<String> = self.handlers.keys().cloned().collect();
            names.push(ActionType::DelegateGoal.name());
            names.sort();
            names
        };
        let beliefs_view = self
            .belief_system
            .query_beliefs(&self.domain, 0.0, None)
            .await;
        let beliefs_summary: Vec<Value> = beliefs_view
            .iter()
            .map(|(k, b)| json!({"key": k, "value": b.value, "confidence": b.confidence}))
            .collect();

        let prompt = format!(
            "You are a BDI planner. Produce a linear plan of actions achieving this goal.\n\
             Goal: {goal_description}\n\
             Beliefs: {}\n\
             Available actions: {}\n\
             Respond ONLY with JSON: {{\"plan\": [{{\"type\": \"ACTION_NAME\", \"params\": {{}}, \
             \"safety_level\": \"low|standard|high|critical\", \
             \"estimated_duration_seconds\": 30, \"rollback_required\": false}}]}}",
            json!(beliefs_summary),
            catalog.join(", "),
        );

        let response = generator
            .generate(&prompt, GenerationOptions::json())
            .await
            .map_err(|e| format!("plan generation: {e}"))?;

        let steps = parse_plan_steps(&response).map_err(|e| format!("plan parse: {e}"))?;
        let actions: Vec<Action> = steps
            .into_iter()
            .map(|step| {
                let mut action =
                    Action::new(ActionType::from_name(&step.action_type), step.params);
                if let Some(level) = step.safety_level {
                    action.meta.safety_level = level;
                }
                if let Some(duration) = step.estimated_duration_seconds {
                    action.meta.estimated_duration_seconds = duration;
                }
                if let Some(required) = step.rollback_required {
                    action.meta.validation.rollback_required = required;
                }
                action
            })
            .collect();

        let plan = Plan::new(goal_id, actions);
        plan.validate(catalog.iter().map(String::as_str))
            .map_err(|e| format!("plan validation: {e}"))?;
        Ok(plan)
    }

    async fn execute_action(&mut self, action: Action) -> ActionResult {
        // Delegation mutates the desire set, so it is handled inline rather
        // than through the handler registry.
        if action.action_type == ActionType::DelegateGoal {
            let description = action
                .params
                .get("description")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ActionFailure::new("INVALID_PARAMS", "missing string param 'description'")
                })?;
            let priority = action
                .params
                .get("priority")
                .and_then(Value::as_u64)
                .map_or(1, |p| u8::try_from(p).unwrap_or(1));
            self.set_goal(description, priority, false);
            return Ok(json!({"delegated": description}));
        }

        let name = action.action_type.name();
        let handler = self
            .handlers
            .get(&name)
            .cloned()
            .ok_or_else(|| ActionFailure::new("UNKNOWN_ACTION", format!("no handler for {name}")))?;

        let budget = Duration::from_secs(
            action.meta.estimated_duration_seconds + self.config.action_timeout_grace_seconds,
        );
        match tokio::time::timeout(budget, handler(action)).await {
            Ok(result) => result,
            Err(_) => Err(ActionFailure::new(
                "TIMEOUT",
                format!("action '{name}' exceeded {}s", budget.as_secs()),
            )),
        }
    }

    async fn trace(&self, process_name: &str, data: Value) {
        self.memory
            .log_process(&self.domain, process_name, data, json!({"domain": self.domain}))
            .await;
    }
}

fn parse_plan_steps(response: &str) -> Result<Vec<PlannedStep>, serde_json::Error> {
    // Accept either an envelope `{"plan": [...]}` or a bare array.
    match serde_json::from_str::<PlanEnvelope>(response) {
        Ok(envelope) => Ok(envelope.plan),
        Err(_) => serde_json::from_str::<Vec<PlannedStep>>(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::GenerationError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Generator that replays a scripted queue of responses.
    struct Scripted {
        responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(
            &self,
            _prompt: &str,
            _options: GenerationOptions,
        ) -> Result<String, GenerationError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(GenerationError::Empty))
        }
    }

    fn plan_json(steps: Value) -> String {
        json!({"plan": steps}).to_string()
    }

    fn executor(generator: Option<Arc<dyn TextGenerator>>) -> (tempfile::TempDir, BdiAgent) {
        let dir = tempfile::tempdir().unwrap();
        let beliefs = Arc::new(BeliefSystem::in_memory());
        let memory = Arc::new(MemoryAgent::new(dir.path().join("memory")));
        let agent = BdiAgent::new(
            "bdi.test",
            beliefs,
            memory,
            generator,
            dir.path().join("workspace"),
            BdiConfig::default(),
        );
        (dir, agent)
    }

    #[tokio::test]
    async fn test_zero_cycles_halts_immediately() {
        let (_dir, mut agent) = executor(None);
        agent.set_goal("anything", 1, true);
        let message = agent.run(0).await;
        assert!(message.starts_with(HALTED_MAX_CYCLES));
    }

    #[tokio::test]
    async fn test_no_goals_completes() {
        let (_dir, mut agent) = executor(None);
        let message = agent.run(10).await;
        assert!(message.starts_with(COMPLETED_GOAL_ACHIEVED));
    }

    #[tokio::test]
    async fn test_goal_achieved_with_noop_plan() {
        let generator = Scripted::new(vec![Ok(plan_json(json!([
            {"type": "NO_OP", "params": {}},
            {"type": "NO_OP", "params": {}},
        ])))]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.set_goal("achieve nothing twice", 1, true);

        let message = agent.run(10).await;
        assert!(
            message.starts_with(COMPLETED_GOAL_ACHIEVED),
            "got: {message}"
        );
        assert_eq!(agent.get_status()["status"], json!("COMPLETED_GOAL_ACHIEVED"));
    }

    #[tokio::test]
    async fn test_planning_failure_exhausts_attempts() {
        let generator = Scripted::new(vec![
            Err(GenerationError::Empty),
            Err(GenerationError::Empty),
            Err(GenerationError::Empty),
        ]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.set_goal("unplannable", 1, true);

        let message = agent.run(10).await;
        assert!(message.starts_with(FAILED_NO_PLAN), "got: {message}");
    }

    #[tokio::test]
    async fn test_no_generator_fails_no_plan() {
        let (_dir, mut agent) = executor(None);
        agent.set_goal("goal", 1, true);
        let message = agent.run(10).await;
        assert!(message.starts_with(FAILED_NO_PLAN));
    }

    #[tokio::test]
    async fn test_action_failure_without_rollback_fails_goal() {
        let generator = Scripted::new(vec![Ok(plan_json(json!([
            {"type": "READ_FILE", "params": {"path": "missing.txt"}, "rollback_required": false},
        ])))]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.set_goal("read a missing file", 1, true);

        let message = agent.run(10).await;
        assert!(message.starts_with(FAILED_PLAN_EXECUTION), "got: {message}");
    }

    #[tokio::test]
    async fn test_rollback_required_triggers_replan() {
        // First plan fails on a missing file with rollback_required; the
        // second plan succeeds.
        let generator = Scripted::new(vec![
            Ok(plan_json(json!([
                {"type": "READ_FILE", "params": {"path": "missing.txt"}, "rollback_required": true},
            ]))),
            Ok(plan_json(json!([
                {"type": "NO_OP", "params": {}},
            ]))),
        ]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.set_goal("recover via replan", 1, true);

        let message = agent.run(10).await;
        assert!(
            message.starts_with(COMPLETED_GOAL_ACHIEVED),
            "got: {message}"
        );
    }

    #[tokio::test]
    async fn test_invalid_plan_counts_as_attempt() {
        // Unknown action in every plan: attempts exhaust to FAILED_NO_PLAN.
        let bad = plan_json(json!([{"type": "TELEPORT", "params": {}}]));
        let generator = Scripted::new(vec![Ok(bad.clone()), Ok(bad.clone()), Ok(bad)]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.set_goal("use unknown action", 1, true);

        let message = agent.run(10).await;
        assert!(message.starts_with(FAILED_NO_PLAN), "got: {message}");
    }

    #[tokio::test]
    async fn test_action_timeout() {
        let generator = Scripted::new(vec![Ok(plan_json(json!([
            {"type": "SLEEP_FOREVER", "params": {}, "estimated_duration_seconds": 0},
        ])))]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.config.action_timeout_grace_seconds = 0;
        agent.register_action(
            "SLEEP_FOREVER",
            Arc::new(|_action| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(json!({}))
                })
            }),
        );
        agent.set_goal("sleep", 1, true);

        let message = agent.run(10).await;
        assert!(message.starts_with(FAILED_PLAN_EXECUTION), "got: {message}");
        assert!(message.contains("TIMEOUT"), "got: {message}");
    }

    #[tokio::test]
    async fn test_primary_goal_supersedes() {
        let (_dir, mut agent) = executor(None);
        agent.set_goal("first", 1, true);
        agent.set_goal("second", 1, true);

        let primaries: Vec<&Goal> = agent.desires.iter().filter(|g| g.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].description, "second");
    }

    #[tokio::test]
    async fn test_delegate_goal_adds_desire() {
        let generator = Scripted::new(vec![Ok(plan_json(json!([
            {"type": "DELEGATE_GOAL", "params": {"description": "sub-goal", "priority": 2}},
        ])))]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.set_goal("delegate", 1, true);

        let message = agent.run(10).await;
        assert!(message.starts_with(COMPLETED_GOAL_ACHIEVED));
        assert!(agent.desires.iter().any(|g| g.description == "sub-goal"));
    }

    #[tokio::test]
    async fn test_failure_context_lands_in_beliefs() {
        let generator = Scripted::new(vec![
            Ok(plan_json(json!([
                {"type": "READ_FILE", "params": {"path": "missing.txt"}, "rollback_required": true},
            ]))),
            Ok(plan_json(json!([{"type": "NO_OP", "params": {}}]))),
        ]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.set_goal("observe failure", 1, true);
        let beliefs = agent.belief_system.clone();

        agent.run(10).await;

        let success = beliefs
            .get_belief("bdi.test.percept.last_action_success")
            .await;
        assert!(success.is_some());
        let result = beliefs
            .get_belief("bdi.test.percept.last_action_result")
            .await
            .unwrap();
        assert_eq!(result.source, BeliefSource::Perception);
    }

    #[tokio::test]
    async fn test_custom_action_registration() {
        let generator = Scripted::new(vec![Ok(plan_json(json!([
            {"type": "CUSTOM_PING", "params": {}},
        ])))]);
        let (_dir, mut agent) = executor(Some(generator));
        agent.register_action(
            "CUSTOM_PING",
            Arc::new(|_action| Box::pin(async { Ok(json!({"pong": true})) })),
        );
        agent.set_goal("ping", 1, true);

        let message = agent.run(10).await;
        assert!(message.starts_with(COMPLETED_GOAL_ACHIEVED), "got: {message}");
    }
}
