//! Mastermind: the strategic planner.
//!
//! Analyzes the system, turns the top suggestion into a concrete BDI goal,
//! runs its own BDI executor, and records every campaign in an append-only
//! history. The Coordinator is a shared collaborator passed in by handle;
//! the BDI instance is owned here.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{
    CampaignKind, CampaignOutcome, CampaignRecord, CampaignStatus, InteractionType,
};
use crate::domain::ports::{GenerationOptions, TextGenerator};
use crate::domain::MindxResult;
use crate::infrastructure::snapshot;
use crate::services::bdi::{ActionFailure, BdiAgent, COMPLETED_GOAL_ACHIEVED};
use crate::services::{
    BeliefSystem, Coordinator, IdManager, MemoryAgent, SystemAnalyzer, ToolRegistry,
};
use crate::domain::models::BeliefSource;

/// Entity id of the Mastermind's identity and memory directory.
pub const MASTERMIND_AGENT_ID: &str = "mastermind_prime";

/// Campaign history file name inside the Mastermind's data directory.
pub const CAMPAIGN_HISTORY_FILE: &str = "mastermind_campaigns_history.json";

/// Message returned when analysis produces nothing actionable.
pub const NO_ACTIONS_MESSAGE: &str = "Analysis complete, no improvement actions to take.";

/// Belief keys the tool-strategy actions communicate through.
const ASSESSMENT_BELIEF: &str = "assessment.tool_suite.latest";
const STRATEGY_BELIEF: &str = "strategy.tool_proposal.latest";

/// The strategic planner.
pub struct Mastermind {
    memory: Arc<MemoryAgent>,
    generator: Option<Arc<dyn TextGenerator>>,
    coordinator: Arc<Coordinator>,
    bdi: Mutex<BdiAgent>,
    history_path: PathBuf,
    history: Mutex<Vec<CampaignRecord>>,
}

impl Mastermind {
    /// Initialize the Mastermind: create its identity, load campaign
    /// history, and register its strategic BDI actions.
    #[allow(clippy::too_many_arguments)]
    pub async fn init(
        belief_system: Arc<BeliefSystem>,
        memory: Arc<MemoryAgent>,
        id_manager: Arc<IdManager>,
        coordinator: Arc<Coordinator>,
        tool_registry: Arc<ToolRegistry>,
        generator: Option<Arc<dyn TextGenerator>>,
        mut bdi: BdiAgent,
        data_dir: PathBuf,
    ) -> MindxResult<Self> {
        id_manager.create_new_wallet(MASTERMIND_AGENT_ID).await?;

        let history_path = data_dir.join(CAMPAIGN_HISTORY_FILE);
        let history: Vec<CampaignRecord> =
            snapshot::load_json(&history_path).await.unwrap_or_default();

        register_mastermind_actions(
            &mut bdi,
            belief_system,
            coordinator.clone(),
            tool_registry,
            generator.clone(),
        );

        info!(campaigns = history.len(), "Mastermind initialized");
        Ok(Self {
            memory,
            generator,
            coordinator,
            bdi: Mutex::new(bdi),
            history_path,
            history: Mutex::new(history),
        })
    }

    /// Alias used by the `evolve` command surface.
    pub async fn command_augmentic_intelligence(&self, directive: &str) -> CampaignOutcome {
        self.manage_mindx_evolution(directive, 25).await
    }

    /// Run one evolution campaign: analyze, pick the top suggestion, hand
    /// it to BDI, and record the outcome.
    pub async fn manage_mindx_evolution(
        &self,
        directive: &str,
        max_bdi_cycles: u32,
    ) -> CampaignOutcome {
        let run_id = format!("mastermind_run_{}", short_id());
        let started_at = chrono::Utc::now();
        info!(run_id, directive, "Starting evolution campaign");

        let suggestions = match &self.generator {
            Some(generator) => {
                let analyzer = SystemAnalyzer::new(generator.clone());
                let context = json!({
                    "agents": self.coordinator.list_agents().await.len(),
                    "backlog": self.coordinator.backlog().await.len(),
                });
                analyzer.analyze(directive, &context).await
            }
            None => Vec::new(),
        };

        if suggestions.is_empty() {
            warn!(run_id, "System analysis yielded no suggestions; campaign ending");
            let outcome = CampaignOutcome {
                overall_campaign_status: CampaignStatus::Success,
                message: NO_ACTIONS_MESSAGE.to_string(),
                run_id: Some(run_id.clone()),
            };
            self.append_record(CampaignRecord {
                run_id,
                kind: CampaignKind::Evolution,
                directive: directive.to_string(),
                top_suggestion: None,
                bdi_final_message: None,
                overall_status: CampaignStatus::Success,
                started_at,
                ended_at: chrono::Utc::now(),
            })
            .await;
            return outcome;
        }

        let top_suggestion = suggestions[0].description.clone();
        info!(run_id, top_suggestion, "Top suggestion selected");

        let final_message = {
            let mut bdi = self.bdi.lock().await;
            bdi.set_goal(
                format!("Implement the following evolution: {top_suggestion}"),
                1,
                true,
            );
            bdi.run(max_bdi_cycles).await
        };

        let overall_status = if final_message.starts_with(COMPLETED_GOAL_ACHIEVED) {
            CampaignStatus::Success
        } else {
            CampaignStatus::FailureOrIncomplete
        };
        info!(run_id, %final_message, status = overall_status.as_str(), "Evolution campaign finished");

        self.append_record(CampaignRecord {
            run_id: run_id.clone(),
            kind: CampaignKind::Evolution,
            directive: directive.to_string(),
            top_suggestion: Some(top_suggestion),
            bdi_final_message: Some(final_message.clone()),
            overall_status,
            started_at,
            ended_at: chrono::Utc::now(),
        })
        .await;

        CampaignOutcome {
            overall_campaign_status: overall_status,
            message: final_message,
            run_id: Some(run_id),
        }
    }

    /// Run one agent-deployment campaign: the goal is framed around agent
    /// lifecycle orchestration rather than codebase evolution.
    pub async fn manage_agent_deployment(
        &self,
        directive: &str,
        max_bdi_cycles: u32,
    ) -> CampaignOutcome {
        let run_id = format!("mastermind_deploy_run_{}", short_id());
        let started_at = chrono::Utc::now();
        info!(run_id, directive, "Starting agent deployment campaign");

        let final_message = {
            let mut bdi = self.bdi.lock().await;
            bdi.set_goal(
                format!(
                    "Create and orchestrate a set of agents to accomplish the following \
                     user desire: '{directive}'. The plan should include creating \
                     necessary agents, having them perform tasks, and then deleting \
                     them if they are temporary."
                ),
                1,
                true,
            );
            bdi.run(max_bdi_cycles).await
        };

        let overall_status = if final_message.starts_with(COMPLETED_GOAL_ACHIEVED) {
            CampaignStatus::Success
        } else {
            CampaignStatus::FailureOrIncomplete
        };

        self.append_record(CampaignRecord {
            run_id: run_id.clone(),
            kind: CampaignKind::Deployment,
            directive: directive.to_string(),
            top_suggestion: None,
            bdi_final_message: Some(final_message.clone()),
            overall_status,
            started_at,
            ended_at: chrono::Utc::now(),
        })
        .await;

        CampaignOutcome {
            overall_campaign_status: overall_status,
            message: final_message,
            run_id: Some(run_id),
        }
    }

    /// Strategic state: BDI status plus the most recent campaigns.
    pub async fn status(&self, last_n: usize) -> Value {
        let history = self.history.lock().await;
        let recent: Vec<&CampaignRecord> = history.iter().rev().take(last_n).collect();
        json!({
            "agent_id": MASTERMIND_AGENT_ID,
            "bdi": self.bdi.lock().await.get_status(),
            "campaigns_recorded": history.len(),
            "recent_campaigns": recent,
        })
    }

    /// Full campaign history, oldest first.
    pub async fn campaign_history(&self) -> Vec<CampaignRecord> {
        self.history.lock().await.clone()
    }

    async fn append_record(&self, record: CampaignRecord) {
        let mut history = self.history.lock().await;
        history.push(record);
        if let Err(e) = snapshot::save_json_atomic(&self.history_path, &*history).await {
            warn!(error = %e, "Campaign history write failed");
        }
        self.memory
            .log_process(
                MASTERMIND_AGENT_ID,
                "mastermind_campaign_recorded",
                json!({"total": history.len()}),
                json!({"agent_id": MASTERMIND_AGENT_ID}),
            )
            .await;
    }
}

fn short_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Register the Mastermind's strategic actions on its BDI executor.
///
/// Each wraps a Coordinator call or a generator-driven JSON synthesis with
/// schema validation.
fn register_mastermind_actions(
    bdi: &mut BdiAgent,
    belief_system: Arc<BeliefSystem>,
    coordinator: Arc<Coordinator>,
    tool_registry: Arc<ToolRegistry>,
    generator: Option<Arc<dyn TextGenerator>>,
) {
    // ASSESS_TOOL_SUITE_EFFECTIVENESS -> belief assessment.tool_suite.latest
    {
        let beliefs = belief_system.clone();
        let tools = tool_registry;
        let generator = generator.clone();
        bdi.register_action(
            "ASSESS_TOOL_SUITE_EFFECTIVENESS",
            Arc::new(move |_action| {
                let beliefs = beliefs.clone();
                let tools = tools.clone();
                let generator = generator.clone();
                Box::pin(async move {
                    let generator = generator.ok_or_else(|| {
                        ActionFailure::new("TOOL_NOT_FOUND", "Mastermind LLM not available.")
                    })?;
                    let listed: Vec<Value> = tools
                        .list()
                        .await
                        .into_iter()
                        .map(|t| json!({"id": t.tool_id, "description": t.description}))
                        .collect();
                    let prompt = format!(
                        "As a strategic AI, assess the current tool suite's effectiveness \
                         and identify gaps.\nRegistered Tools:\n{}\n\nProvide your \
                         assessment in JSON format with keys 'overall_assessment' (string) \
                         and 'identified_gaps' (list of strings).",
                        json!(listed)
                    );
                    let response = generator
                        .generate(&prompt, GenerationOptions::json())
                        .await
                        .map_err(|e| ActionFailure::new("GENERATION_FAILED", e.to_string()))?;
                    let assessment: Value = serde_json::from_str(&response)
                        .map_err(|e| ActionFailure::new("GENERATION_PARSE", e.to_string()))?;
                    if assessment.get("overall_assessment").is_none() {
                        return Err(ActionFailure::new(
                            "SCHEMA_VIOLATION",
                            "assessment missing 'overall_assessment'",
                        ));
                    }
                    beliefs
                        .add_belief(ASSESSMENT_BELIEF, assessment.clone(), 1.0, BeliefSource::SelfAnalysis)
                        .await;
                    Ok(assessment)
                })
            }),
        );
    }

    // PROPOSE_TOOL_STRATEGY -> belief strategy.tool_proposal.latest
    {
        let beliefs = belief_system.clone();
        let generator = generator.clone();
        bdi.register_action(
            "PROPOSE_TOOL_STRATEGY",
            Arc::new(move |action| {
                let beliefs = beliefs.clone();
                let generator = generator.clone();
                Box::pin(async move {
                    let generator = generator.ok_or_else(|| {
                        ActionFailure::new("TOOL_NOT_FOUND", "Mastermind LLM not available.")
                    })?;
                    let assessment_key = action
                        .params
                        .get("assessment_belief_key")
                        .and_then(Value::as_str)
                        .unwrap_or(ASSESSMENT_BELIEF);
                    let assessment = beliefs
                        .get_belief(assessment_key)
                        .await
                        .map_or_else(|| json!("No assessment provided."), |b| b.value);
                    let prompt = format!(
                        "Based on the following tool suite assessment, propose a list of \
                         concrete strategic actions (e.g., 'CONCEPTUALIZE_NEW_TOOL').\n\
                         Assessment: {assessment}\n\nRespond ONLY with a JSON object \
                         containing a 'recommendations' list."
                    );
                    let response = generator
                        .generate(&prompt, GenerationOptions::json())
                        .await
                        .map_err(|e| ActionFailure::new("GENERATION_FAILED", e.to_string()))?;
                    let strategy: Value = serde_json::from_str(&response)
                        .map_err(|e| ActionFailure::new("GENERATION_PARSE", e.to_string()))?;
                    if !strategy
                        .get("recommendations")
                        .is_some_and(Value::is_array)
                    {
                        return Err(ActionFailure::new(
                            "SCHEMA_VIOLATION",
                            "strategy missing 'recommendations' list",
                        ));
                    }
                    beliefs
                        .add_belief(STRATEGY_BELIEF, strategy.clone(), 1.0, BeliefSource::SelfAnalysis)
                        .await;
                    Ok(strategy)
                })
            }),
        );
    }

    // CONCEPTUALIZE_NEW_TOOL -> belief mindx.new_tool_concept.<tool_id>
    {
        let beliefs = belief_system;
        bdi.register_action(
            "CONCEPTUALIZE_NEW_TOOL",
            Arc::new(move |action| {
                let beliefs = beliefs.clone();
                let generator = generator.clone();
                Box::pin(async move {
                    let generator = generator.ok_or_else(|| {
                        ActionFailure::new("TOOL_NOT_FOUND", "Mastermind LLM not available.")
                    })?;
                    let proposal_key = action
                        .params
                        .get("strategic_proposal_belief_key")
                        .and_then(Value::as_str)
                        .unwrap_or(STRATEGY_BELIEF);
                    let proposal = beliefs.get_belief(proposal_key).await.ok_or_else(|| {
                        ActionFailure::new(
                            "PRECONDITION_FAILED",
                            "No strategic proposal found in beliefs to act on.",
                        )
                    })?;
                    let recommendation = proposal
                        .value
                        .get("recommendations")
                        .and_then(Value::as_array)
                        .and_then(|recs| {
                            recs.iter().find(|r| {
                                r.get("action").and_then(Value::as_str)
                                    == Some("CONCEPTUALIZE_NEW_TOOL")
                            })
                        })
                        .cloned()
                        .ok_or_else(|| {
                            ActionFailure::new(
                                "PRECONDITION_FAILED",
                                "No 'CONCEPTUALIZE_NEW_TOOL' recommendation found in the latest strategy.",
                            )
                        })?;
                    let need = recommendation
                        .get("target")
                        .and_then(Value::as_str)
                        .unwrap_or("an identified strategic gap")
                        .to_string();

                    let prompt = format!(
                        "Define a concept for a new tool to address this need: '{need}'.\n\
                         Provide a complete JSON object with all required keys for tool \
                         registration: 'tool_id', 'display_name', 'description', \
                         'module_path', 'class_name', 'capabilities' (list), \
                         'needs_identity' (bool), 'initial_version', 'initial_status'."
                    );
                    let response = generator
                        .generate(&prompt, GenerationOptions::json())
                        .await
                        .map_err(|e| ActionFailure::new("GENERATION_FAILED", e.to_string()))?;
                    let concept: Value = serde_json::from_str(&response)
                        .map_err(|e| ActionFailure::new("GENERATION_PARSE", e.to_string()))?;

                    let required = [
                        "tool_id",
                        "display_name",
                        "description",
                        "module_path",
                        "class_name",
                        "capabilities",
                    ];
                    let missing: Vec<&str> = required
                        .iter()
                        .copied()
                        .filter(|k| concept.get(k).is_none())
                        .collect();
                    if !missing.is_empty() {
                        return Err(ActionFailure::new(
                            "SCHEMA_VIOLATION",
                            format!("tool concept missing required keys: {missing:?}"),
                        ));
                    }

                    let tool_id = concept["tool_id"].as_str().unwrap_or("unnamed").to_string();
                    beliefs
                        .add_belief(
                            &format!("mindx.new_tool_concept.{tool_id}"),
                            concept.clone(),
                            1.0,
                            BeliefSource::SelfAnalysis,
                        )
                        .await;
                    Ok(concept)
                })
            }),
        );
    }

    // CREATE_AGENT -> Coordinator registry
    {
        let coordinator_for_create = coordinator.clone();
        bdi.register_action(
            "CREATE_AGENT",
            Arc::new(move |action| {
                let coordinator = coordinator_for_create.clone();
                Box::pin(async move {
                    let agent_type = action
                        .params
                        .get("agent_type")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            ActionFailure::new(
                                "INVALID_PARAMS",
                                "Missing agent_type or agent_id for CREATE_AGENT action.",
                            )
                        })?
                        .to_string();
                    let agent_id = action
                        .params
                        .get("agent_id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            ActionFailure::new(
                                "INVALID_PARAMS",
                                "Missing agent_type or agent_id for CREATE_AGENT action.",
                            )
                        })?
                        .to_string();
                    let description = action
                        .params
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("Created by Mastermind")
                        .to_string();

                    let registration = coordinator
                        .register_agent(&agent_id, &agent_type, &description, None)
                        .await
                        .map_err(|e| ActionFailure::new("EXECUTION_FAILED", e.to_string()))?;
                    Ok(json!({"status": "SUCCESS", "registration": registration}))
                })
            }),
        );
    }

    // DELETE_AGENT -> Coordinator registry
    {
        let coordinator_for_delete = coordinator.clone();
        bdi.register_action(
            "DELETE_AGENT",
            Arc::new(move |action| {
                let coordinator = coordinator_for_delete.clone();
                Box::pin(async move {
                    let agent_id = action
                        .params
                        .get("agent_id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            ActionFailure::new(
                                "INVALID_PARAMS",
                                "Missing agent_id for DELETE_AGENT action.",
                            )
                        })?
                        .to_string();
                    let removed = coordinator
                        .deregister_and_shutdown_agent(&agent_id)
                        .await
                        .map_err(|e| ActionFailure::new("EXECUTION_FAILED", e.to_string()))?;
                    if removed {
                        Ok(json!({"status": "SUCCESS", "agent_id": agent_id}))
                    } else {
                        Err(ActionFailure::new(
                            "AGENT_NOT_FOUND",
                            format!("Agent not found: {agent_id}"),
                        ))
                    }
                })
            }),
        );
    }

    // EVOLVE_AGENT -> ComponentImprovement interaction
    bdi.register_action(
        "EVOLVE_AGENT",
        Arc::new(move |action| {
            let coordinator = coordinator.clone();
            Box::pin(async move {
                let agent_id = action.params.get("agent_id").and_then(Value::as_str);
                let directive = action.params.get("directive").and_then(Value::as_str);
                let (Some(agent_id), Some(directive)) = (agent_id, directive) else {
                    return Err(ActionFailure::new(
                        "INVALID_PARAMS",
                        "Missing agent_id or directive for EVOLVE_AGENT action.",
                    ));
                };
                let result = coordinator
                    .handle_user_input(
                        &format!("Evolve agent '{agent_id}' with directive: {directive}"),
                        MASTERMIND_AGENT_ID,
                        InteractionType::ComponentImprovement,
                        json!({"target_component": agent_id, "analysis_context": directive}),
                    )
                    .await;
                if result["status"] == json!("completed") {
                    Ok(result)
                } else {
                    Err(ActionFailure::new(
                        "EXECUTION_FAILED",
                        format!("interaction status: {}", result["status"]),
                    ))
                }
            })
        }),
    );
}
