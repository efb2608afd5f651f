//! AGInt: the per-directive cognitive loop.
//!
//! Runs Perceive -> Orient -> Decide -> Act as a cooperative task. The
//! decision core is a deterministic rule tree; LLM enrichment only fills in
//! parameters and can never change the selected decision type. Perception
//! always observes the immediately preceding action's outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::models::config::AgintConfig;
use crate::domain::models::{InteractionStatus, InteractionType};
use crate::domain::ports::{GenerationOptions, Searcher, TextGenerator};
use crate::domain::MindxResult;
use crate::services::bdi::{BdiAgent, COMPLETED_GOAL_ACHIEVED};
use crate::services::{Coordinator, MemoryAgent};

/// Token the self-repair verification generation must contain.
const HEALTH_CHECK_TOKEN: &str = "OK";

/// Loop status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgintStatus {
    Inactive,
    Running,
    AwaitingDirective,
    Failed,
}

/// The deterministic decision types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    BdiDelegation,
    Research,
    Cooldown,
    SelfRepair,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BdiDelegation => "BDI_DELEGATION",
            Self::Research => "RESEARCH",
            Self::Cooldown => "COOLDOWN",
            Self::SelfRepair => "SELF_REPAIR",
        }
    }
}

/// Deterministic, priority-ordered decision rule.
///
/// `COOLDOWN` is not reachable here; it only arises from enrichment
/// failure downstream.
pub fn decide_rule_based(llm_operational: bool, last_action_failed: bool) -> DecisionType {
    if !llm_operational {
        DecisionType::SelfRepair
    } else if last_action_failed {
        DecisionType::Research
    } else {
        DecisionType::BdiDelegation
    }
}

/// A decision with its enrichment parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub decision_type: DecisionType,
    pub details: Value,
}

/// What one cycle perceives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Perception {
    pub timestamp: chrono::DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action_failure_context: Option<Value>,
}

#[derive(Debug, Clone)]
struct ActionContext {
    success: bool,
    result: Value,
}

struct AgintState {
    llm_operational: bool,
    awareness: String,
    last_action_context: Option<ActionContext>,
}

/// The cognitive loop agent.
pub struct Agint {
    agent_id: String,
    config: AgintConfig,
    generator: Option<Arc<dyn TextGenerator>>,
    searcher: Option<Arc<dyn Searcher>>,
    coordinator: Option<Arc<Coordinator>>,
    memory: Arc<MemoryAgent>,
    bdi: Mutex<BdiAgent>,
    status: RwLock<AgintStatus>,
    directive: RwLock<Option<String>>,
    state: Mutex<AgintState>,
    running: AtomicBool,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl Agint {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_id: impl Into<String>,
        bdi: BdiAgent,
        config: AgintConfig,
        generator: Option<Arc<dyn TextGenerator>>,
        searcher: Option<Arc<dyn Searcher>>,
        coordinator: Option<Arc<Coordinator>>,
        memory: Arc<MemoryAgent>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            config,
            generator,
            searcher,
            coordinator,
            memory,
            bdi: Mutex::new(bdi),
            status: RwLock::new(AgintStatus::Inactive),
            directive: RwLock::new(None),
            state: Mutex::new(AgintState {
                llm_operational: true,
                awareness: "System starting up.".to_string(),
                last_action_context: None,
            }),
            running: AtomicBool::new(false),
            loop_task: Mutex::new(None),
        }
    }

    /// Current loop status.
    pub async fn status(&self) -> AgintStatus {
        *self.status.read().await
    }

    /// Whether the loop believes the LLM is healthy.
    pub async fn llm_operational(&self) -> bool {
        self.state.lock().await.llm_operational
    }

    /// Mark the LLM unhealthy/healthy (used by supervisors and tests).
    pub async fn set_llm_operational(&self, operational: bool) {
        self.state.lock().await.llm_operational = operational;
    }

    /// Set the primary directive without starting the loop. Used for
    /// bounded one-shot cycle runs.
    pub async fn set_directive(&self, directive: impl Into<String>) {
        *self.directive.write().await = Some(directive.into());
    }

    /// Begin the cognitive loop over a directive. No-op while running.
    pub async fn start(self: &Arc<Self>, directive: impl Into<String>) {
        if *self.status.read().await == AgintStatus::Running {
            return;
        }
        *self.directive.write().await = Some(directive.into());
        *self.status.write().await = AgintStatus::Running;
        self.running.store(true, Ordering::SeqCst);

        let agint = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while agint.running.load(Ordering::SeqCst) {
                if let Err(e) = agint.run_single_cycle().await {
                    error!(agent_id = %agint.agent_id, error = %e, "Unhandled error in cognitive loop");
                    *agint.status.write().await = AgintStatus::Failed;
                    agint.running.store(false, Ordering::SeqCst);
                    return;
                }
                let delay = Duration::from_secs_f64(agint.config.cycle_delay_seconds);
                agint.interruptible_sleep(delay).await;
            }
            let mut status = agint.status.write().await;
            if *status == AgintStatus::Running {
                *status = AgintStatus::Inactive;
            }
        });
        *self.loop_task.lock().await = Some(handle);
        info!(agent_id = %self.agent_id, "Cognitive loop started");
    }

    /// Request cancellation and await loop termination. The in-flight cycle
    /// finishes; it is never preempted mid-action.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.loop_task.lock().await.take() {
            let _ = handle.await;
        }
        let mut status = self.status.write().await;
        if *status == AgintStatus::Running {
            *status = AgintStatus::Inactive;
        }
        info!(agent_id = %self.agent_id, "Cognitive loop stopped");
    }

    /// One full Perceive -> Orient/Decide -> Act cycle.
    pub async fn run_single_cycle(&self) -> MindxResult<()> {
        let perception = self.perceive().await;
        self.trace("agint_perception", serde_json::to_value(&perception)?)
            .await;

        let decision = self.orient_and_decide(&perception).await;
        self.trace(
            "agint_decision",
            json!({"type": decision.decision_type, "details": decision.details}),
        )
        .await;

        let (success, result) = self.act(&decision).await;
        self.trace(
            "agint_action",
            json!({"success": success, "result": &result}),
        )
        .await;
        self.state.lock().await.last_action_context = Some(ActionContext { success, result });
        Ok(())
    }

    /// Perception observes only the immediately preceding action.
    async fn perceive(&self) -> Perception {
        let state = self.state.lock().await;
        let failure_context = state
            .last_action_context
            .as_ref()
            .filter(|ctx| !ctx.success)
            .map(|ctx| ctx.result.clone());
        if let Some(context) = &failure_context {
            warn!(agent_id = %self.agent_id, ?context, "Perceiving with failure context");
        }
        Perception {
            timestamp: Utc::now(),
            last_action_failure_context: failure_context,
        }
    }

    /// Rule-based decide, then best-effort LLM enrichment. Enrichment can
    /// only fill `details`; a failed enrichment degrades to `COOLDOWN`.
    async fn orient_and_decide(&self, perception: &Perception) -> Decision {
        let llm_operational = self.state.lock().await.llm_operational;
        let directive = self.directive.read().await.clone().unwrap_or_default();
        let decision_type = decide_rule_based(
            llm_operational,
            perception.last_action_failure_context.is_some(),
        );
        self.trace(
            "agint_rule_decision",
            json!({"decision": decision_type.as_str()}),
        )
        .await;

        let Some(generator) = self.generator.clone() else {
            self.state.lock().await.llm_operational = false;
            return Decision {
                decision_type: DecisionType::Cooldown,
                details: json!({"reason": "Orient/Decide LLM not configured."}),
            };
        };

        let prompt = format!(
            "As an AI core, your directive is '{directive}'. Your chosen action is \
             '{}'. Synthesize 'situational_awareness' from the perception, especially \
             'last_action_failure_context'. Then formulate 'decision_details' for your \
             action. Perception: {}. Respond ONLY with JSON: \
             {{\"situational_awareness\": \"...\", \"decision_details\": {{...}}}}",
            decision_type.as_str(),
            serde_json::to_string(perception).unwrap_or_default(),
        );

        let response = match generator.generate(&prompt, GenerationOptions::json()).await {
            Ok(text) => text,
            Err(e) => {
                self.state.lock().await.llm_operational = false;
                return Decision {
                    decision_type: DecisionType::Cooldown,
                    details: json!({"reason": format!("Orient/Decide LLM call failed: {e}")}),
                };
            }
        };

        match serde_json::from_str::<Value>(&response) {
            Ok(data) => {
                let (Some(awareness), Some(details)) = (
                    data.get("situational_awareness").and_then(Value::as_str),
                    data.get("decision_details"),
                ) else {
                    return Decision {
                        decision_type: DecisionType::Cooldown,
                        details: json!({"reason": "LLM response validation failed: required keys missing."}),
                    };
                };
                self.state.lock().await.awareness = awareness.to_string();
                Decision {
                    decision_type,
                    details: details.clone(),
                }
            }
            Err(e) => Decision {
                decision_type: DecisionType::Cooldown,
                details: json!({"reason": format!("LLM response validation failed: {e}")}),
            },
        }
    }

    /// Dispatch the decision to its executor.
    async fn act(&self, decision: &Decision) -> (bool, Value) {
        info!(agent_id = %self.agent_id, decision = decision.decision_type.as_str(), "AGInt action");
        match decision.decision_type {
            DecisionType::BdiDelegation => {
                let task = match decision
                    .details
                    .get("task_description")
                    .and_then(Value::as_str)
                {
                    Some(task) => Some(task.to_string()),
                    None => self.directive.read().await.clone(),
                };
                self.delegate_task_to_bdi(task).await
            }
            DecisionType::Research => {
                let query = decision
                    .details
                    .get("search_query")
                    .and_then(Value::as_str)
                    .map(String::from);
                self.execute_research(query).await
            }
            DecisionType::SelfRepair => self.execute_self_repair().await,
            DecisionType::Cooldown => self.execute_cooldown().await,
        }
    }

    /// Hand a task to the subordinate BDI executor and await its outcome.
    /// Refuses while a previous delegation is still running.
    async fn delegate_task_to_bdi(&self, task_description: Option<String>) -> (bool, Value) {
        let Some(task_description) = task_description else {
            return (false, json!({"error": "No task description provided for BDI agent."}));
        };
        let Ok(mut bdi) = self.bdi.try_lock() else {
            return (false, json!({"error": "BDI_BUSY", "details": "Previous delegation unfinished."}));
        };
        self.trace(
            "agint_bdi_delegation_start",
            json!({"task_description": task_description}),
        )
        .await;

        bdi.set_goal(&task_description, 1, true);
        let message = bdi.run(self.config.max_bdi_cycles).await;
        if message.starts_with(COMPLETED_GOAL_ACHIEVED) {
            (true, json!({"task_outcome_message": message}))
        } else {
            (
                false,
                json!({"error": "BDI_TASK_FAILED", "details": message}),
            )
        }
    }

    /// Run a web search via the registered searcher.
    async fn execute_research(&self, query: Option<String>) -> (bool, Value) {
        let Some(searcher) = &self.searcher else {
            return (false, json!({"error": "WebSearchTool not available"}));
        };
        let Some(query) = query else {
            return (false, json!({"error": "No query provided for research."}));
        };
        match searcher.search(&query).await {
            Ok(results) => (
                true,
                json!({"search_results_summary": format!("Found {} results.", results.len())}),
            ),
            Err(e) => (false, json!({"error": format!("Research failed: {e}")})),
        }
    }

    /// Request a system analysis from the Coordinator, then verify LLM
    /// connectivity before declaring the repair successful.
    async fn execute_self_repair(&self) -> (bool, Value) {
        info!(agent_id = %self.agent_id, "Initiating self-repair sequence");
        let Some(coordinator) = &self.coordinator else {
            return (false, json!({"error": "CoordinatorAgent not available."}));
        };

        let interaction = coordinator.create_interaction(
            InteractionType::SystemAnalysis,
            "Automated self-repair triggered.",
            json!({"agent_id": self.agent_id}),
        );
        let processed = coordinator.process_interaction(interaction).await;
        if processed.status != InteractionStatus::Completed {
            return (
                false,
                json!({"error": format!(
                    "Coordinator failed repair task with status {}",
                    processed.status.as_str()
                )}),
            );
        }

        // Verification is mandatory: the repair only counts once a trivial
        // health-check generation answers positively.
        let Some(generator) = self.generator.clone() else {
            return (false, json!({"error": "Self-repair verification failed."}));
        };
        if let Err(e) = generator.reload().await {
            warn!(agent_id = %self.agent_id, error = %e, "Generator reload failed");
        }
        let verification = generator
            .generate(
                "Status check. Respond ONLY with 'OK'.",
                GenerationOptions::default(),
            )
            .await;

        match verification {
            Ok(text) if text.contains(HEALTH_CHECK_TOKEN) => {
                self.state.lock().await.llm_operational = true;
                (true, json!({"message": "Self-repair verification successful."}))
            }
            _ => {
                self.state.lock().await.llm_operational = false;
                (false, json!({"error": "Self-repair verification failed."}))
            }
        }
    }

    /// Pause the loop after enrichment failures.
    async fn execute_cooldown(&self) -> (bool, Value) {
        let period = Duration::from_secs_f64(self.config.llm_failure_cooldown_seconds);
        info!(agent_id = %self.agent_id, seconds = period.as_secs_f64(), "Executing cooldown");
        self.interruptible_sleep(period).await;
        (
            true,
            json!({"message": format!("Successfully waited for {}s.", period.as_secs_f64())}),
        )
    }

    /// Sleep in short ticks so `stop()` is honored promptly. Outside the
    /// loop (one-shot cycles) there is nothing to wait out.
    async fn interruptible_sleep(&self, total: Duration) {
        let tick = Duration::from_millis(100);
        let mut remaining = total;
        while remaining > Duration::ZERO {
            if !self.running.load(Ordering::SeqCst) {
                return;
            }
            let step = remaining.min(tick);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
    }

    async fn trace(&self, process_name: &str, data: Value) {
        self.memory
            .log_process(
                &self.agent_id,
                process_name,
                data,
                json!({"agent_id": self.agent_id}),
            )
            .await;
    }
}

impl Drop for Agint {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
