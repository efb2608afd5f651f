//! Coordinator: shared bus, agent registry, and improvement backlog.
//!
//! Holds the live agent registry (mirrored to
//! `data/config/official_agents_registry.json`), dispatches typed
//! interactions, and maintains the improvement backlog in
//! `(priority desc, created_at asc)` order. Backlog processing is bounded
//! to one in-flight item per target component.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::models::{
    AgentRegistration, AgentsRegistryDoc, BacklogItem, BacklogStatus, Interaction,
    InteractionType, RegistrationStatus, DEFAULT_BACKLOG_PRIORITY, MAX_BACKLOG_PRIORITY,
};
use crate::domain::ports::{AgentHandle, GenerationOptions, TextGenerator};
use crate::domain::{MindxError, MindxResult};
use crate::infrastructure::snapshot;
use crate::services::{IdManager, MemoryAgent, SystemAnalyzer};
use uuid::Uuid;

/// Entity id the Coordinator traces under.
pub const COORDINATOR_AGENT_ID: &str = "coordinator_agent_main";

struct CoordinatorState {
    agents: BTreeMap<String, AgentRegistration>,
    handles: HashMap<String, Arc<dyn AgentHandle>>,
    backlog: Vec<BacklogItem>,
    in_flight_components: HashSet<String>,
}

/// Shared bus and backlog owner.
pub struct Coordinator {
    id_manager: Arc<IdManager>,
    memory: Arc<MemoryAgent>,
    generator: Option<Arc<dyn TextGenerator>>,
    registry_path: PathBuf,
    state: Mutex<CoordinatorState>,
}

impl Coordinator {
    /// Open the coordinator, loading the persistent registry mirror.
    pub async fn open(
        id_manager: Arc<IdManager>,
        memory: Arc<MemoryAgent>,
        generator: Option<Arc<dyn TextGenerator>>,
        registry_path: impl Into<PathBuf>,
    ) -> Self {
        let registry_path = registry_path.into();
        let doc: AgentsRegistryDoc = snapshot::load_json(&registry_path).await.unwrap_or_default();
        info!(agents = doc.registered_agents.len(), "Coordinator initialized");
        Self {
            id_manager,
            memory,
            generator,
            registry_path,
            state: Mutex::new(CoordinatorState {
                agents: doc.registered_agents,
                handles: HashMap::new(),
                backlog: Vec::new(),
                in_flight_components: HashSet::new(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Agent registry
    // ------------------------------------------------------------------

    /// Register (or replace) an agent: creates its identity, signs the
    /// registration payload with it, and mirrors the registry to disk.
    pub async fn register_agent(
        &self,
        agent_id: &str,
        agent_type: &str,
        description: &str,
        handle: Option<Arc<dyn AgentHandle>>,
    ) -> MindxResult<AgentRegistration> {
        let (address, _) = self.id_manager.create_new_wallet(agent_id).await?;
        let payload = AgentRegistration::signature_payload(agent_id);
        let signature = self.id_manager.sign_message(agent_id, &payload).await?;

        let mut registration = AgentRegistration::new(agent_id, agent_type, description);
        registration.public_address = Some(address);
        registration.signature = Some(signature);
        registration.status = RegistrationStatus::Registered;

        {
            let mut state = self.state.lock().await;
            state
                .agents
                .insert(agent_id.to_string(), registration.clone());
            if let Some(handle) = handle {
                state.handles.insert(agent_id.to_string(), handle);
            }
            self.mirror_registry(&state.agents).await;
        }

        self.trace(
            "coordinator_agent_registered",
            json!({"agent_id": agent_id, "agent_type": agent_type}),
        )
        .await;
        Ok(registration)
    }

    /// Shut down (when a handle is held) and remove an agent.
    pub async fn deregister_and_shutdown_agent(&self, agent_id: &str) -> MindxResult<bool> {
        let handle = {
            let mut state = self.state.lock().await;
            if state.agents.remove(agent_id).is_none() {
                return Ok(false);
            }
            self.mirror_registry(&state.agents).await;
            state.handles.remove(agent_id)
        };
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
        self.trace(
            "coordinator_agent_deregistered",
            json!({"agent_id": agent_id}),
        )
        .await;
        Ok(true)
    }

    /// Copy of the registry, in id order.
    pub async fn list_agents(&self) -> Vec<AgentRegistration> {
        self.state.lock().await.agents.values().cloned().collect()
    }

    /// Copy of one registration.
    pub async fn get_agent(&self, agent_id: &str) -> Option<AgentRegistration> {
        self.state.lock().await.agents.get(agent_id).cloned()
    }

    /// Enable/disable an agent in the registry and its mirror.
    pub async fn set_agent_enabled(&self, agent_id: &str, enabled: bool) -> MindxResult<bool> {
        let mut state = self.state.lock().await;
        let Some(agent) = state.agents.get_mut(agent_id) else {
            return Ok(false);
        };
        agent.enabled = enabled;
        agent.status = if enabled {
            RegistrationStatus::Registered
        } else {
            RegistrationStatus::Disabled
        };
        self.mirror_registry(&state.agents).await;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Interactions
    // ------------------------------------------------------------------

    /// Create a pending interaction.
    pub fn create_interaction(
        &self,
        interaction_type: InteractionType,
        content: impl Into<String>,
        metadata: Value,
    ) -> Interaction {
        Interaction::new(interaction_type, content, metadata)
    }

    /// Process an interaction to a terminal state.
    pub async fn process_interaction(&self, mut interaction: Interaction) -> Interaction {
        interaction.begin();
        let outcome = match interaction.interaction_type {
            InteractionType::SystemAnalysis => self.handle_system_analysis(&interaction).await,
            InteractionType::UserQuery => self.handle_user_query(&interaction).await,
            InteractionType::ComponentImprovement => {
                self.handle_component_improvement(&interaction).await
            }
        };
        match outcome {
            Ok(result) => interaction.complete(result),
            Err(e) => interaction.fail(e.to_string()),
        }
        self.memory
            .save_interaction_memory(COORDINATOR_AGENT_ID, &interaction)
            .await;
        interaction
    }

    /// Route user input to the right handler and return a JSON envelope.
    pub async fn handle_user_input(
        &self,
        content: &str,
        user_id: &str,
        interaction_type: InteractionType,
        metadata: Value,
    ) -> Value {
        let mut metadata = metadata;
        if let Some(map) = metadata.as_object_mut() {
            map.insert("user_id".to_string(), json!(user_id));
        }
        let interaction = self.create_interaction(interaction_type, content, metadata);
        let processed = self.process_interaction(interaction).await;
        json!({
            "interaction_id": processed.id,
            "interaction_type": processed.interaction_type,
            "status": processed.status,
            "result": processed.result,
            "error": processed.error,
        })
    }

    async fn handle_system_analysis(&self, interaction: &Interaction) -> MindxResult<Value> {
        let generator = self.require_generator()?;
        let analyzer = SystemAnalyzer::new(generator);
        let context = json!({
            "agents": self.list_agents().await.len(),
            "backlog": self.backlog().await.len(),
        });
        let suggestions = analyzer.analyze(&interaction.content, &context).await;
        Ok(json!({"improvement_suggestions": suggestions}))
    }

    async fn handle_user_query(&self, interaction: &Interaction) -> MindxResult<Value> {
        let generator = self.require_generator()?;
        let answer = generator
            .generate(&interaction.content, GenerationOptions::default())
            .await
            .map_err(|e| MindxError::ExecutionFailed(format!("query generation: {e}")))?;
        Ok(json!({"response": answer}))
    }

    async fn handle_component_improvement(&self, interaction: &Interaction) -> MindxResult<Value> {
        // Clamp into the backlog priority domain [0, 10]; anything wider
        // would jump the (priority desc, created_at asc) queue.
        let priority = interaction
            .metadata
            .get("priority")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_BACKLOG_PRIORITY, |p| {
                u8::try_from(p)
                    .unwrap_or(MAX_BACKLOG_PRIORITY)
                    .min(MAX_BACKLOG_PRIORITY)
            });
        let target = interaction
            .metadata
            .get("target_component")
            .and_then(Value::as_str)
            .unwrap_or("system")
            .to_string();
        let source = interaction
            .metadata
            .get("user_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let item = BacklogItem::new(interaction.content.clone(), priority, source, target);
        let item_id = self.add_backlog_item(item).await;
        Ok(json!({"backlog_item_id": item_id, "status": "queued"}))
    }

    // ------------------------------------------------------------------
    // Backlog
    // ------------------------------------------------------------------

    /// Insert an item keeping `(priority desc, created_at asc)` order.
    pub async fn add_backlog_item(&self, item: BacklogItem) -> Uuid {
        let id = item.id;
        let mut state = self.state.lock().await;
        let pos = state
            .backlog
            .binary_search_by(|probe| probe.queue_cmp(&item))
            .unwrap_or_else(|pos| pos);
        state.backlog.insert(pos, item);
        id
    }

    /// Enqueue on behalf of a recurring campaign, refusing while an item
    /// from the same campaign is still pending or in progress.
    pub async fn enqueue_campaign_item(
        &self,
        campaign_id: &str,
        description: &str,
        priority: u8,
        target_component: &str,
    ) -> MindxResult<Uuid> {
        {
            let state = self.state.lock().await;
            let in_flight = state.backlog.iter().any(|item| {
                item.source == campaign_id
                    && matches!(
                        item.status,
                        BacklogStatus::Pending | BacklogStatus::InProgress
                    )
            });
            if in_flight {
                return Err(MindxError::DuplicateCampaignItem(campaign_id.to_string()));
            }
        }
        let item = BacklogItem::new(description, priority, campaign_id, target_component);
        Ok(self.add_backlog_item(item).await)
    }

    /// Ordered copy of the backlog.
    pub async fn backlog(&self) -> Vec<BacklogItem> {
        self.state.lock().await.backlog.clone()
    }

    /// Reinstate an item for processing (`Rejected -> Pending`; pending
    /// items are confirmed unchanged).
    pub async fn approve_backlog_item(&self, item_id: Uuid) -> MindxResult<BacklogItem> {
        let mut state = self.state.lock().await;
        let item = state
            .backlog
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(MindxError::BacklogItemNotFound(item_id))?;
        if item.status == BacklogStatus::Rejected {
            item.status = BacklogStatus::Pending;
        }
        Ok(item.clone())
    }

    /// Reject a pending item.
    pub async fn reject_backlog_item(&self, item_id: Uuid) -> MindxResult<BacklogItem> {
        let mut state = self.state.lock().await;
        let item = state
            .backlog
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(MindxError::BacklogItemNotFound(item_id))?;
        if !item.status.is_terminal() {
            item.status = BacklogStatus::Rejected;
        }
        Ok(item.clone())
    }

    /// Pop and process the highest-priority pending item whose target
    /// component has nothing else in flight. Returns the item in its
    /// terminal state, or `None` when the backlog has no eligible work.
    pub async fn process_next_backlog_item(&self) -> Option<BacklogItem> {
        let claimed = {
            let mut state = self.state.lock().await;
            // Backlog is kept ordered, so the first eligible pending item
            // is the right one.
            let index = state.backlog.iter().position(|item| {
                item.status == BacklogStatus::Pending
                    && !state.in_flight_components.contains(&item.target_component)
            })?;
            let component = state.backlog[index].target_component.clone();
            state.in_flight_components.insert(component);
            state.backlog[index].status = BacklogStatus::InProgress;
            state.backlog[index].clone()
        };

        let outcome = self.run_improvement(&claimed).await;

        let mut state = self.state.lock().await;
        state.in_flight_components.remove(&claimed.target_component);
        let item = state.backlog.iter_mut().find(|i| i.id == claimed.id)?;
        item.status = match outcome {
            Ok(()) => BacklogStatus::Done,
            Err(ref e) => {
                warn!(item_id = %claimed.id, error = %e, "Backlog item processing failed");
                BacklogStatus::Rejected
            }
        };
        Some(item.clone())
    }

    async fn run_improvement(&self, item: &BacklogItem) -> MindxResult<()> {
        let generator = self.require_generator()?;
        let prompt = format!(
            "Propose a concrete change for component '{}' that satisfies: {}. \
             Respond ONLY with JSON: {{\"change_summary\": \"...\", \"steps\": [\"...\"]}}",
            item.target_component, item.description
        );
        let response = generator
            .generate(&prompt, GenerationOptions::json())
            .await
            .map_err(|e| MindxError::ExecutionFailed(format!("improvement generation: {e}")))?;
        let parsed: Value = serde_json::from_str(&response)?;

        self.trace(
            "coordinator_backlog_item_processed",
            json!({
                "item_id": item.id,
                "target_component": item.target_component,
                "result": parsed,
            }),
        )
        .await;
        Ok(())
    }

    // ------------------------------------------------------------------

    fn require_generator(&self) -> MindxResult<Arc<dyn TextGenerator>> {
        self.generator
            .clone()
            .ok_or_else(|| MindxError::ExecutionFailed("Text generator not configured".into()))
    }

    async fn mirror_registry(&self, agents: &BTreeMap<String, AgentRegistration>) {
        let doc = AgentsRegistryDoc {
            agents_schema_version: crate::domain::models::registration::AGENTS_SCHEMA_VERSION,
            registered_agents: agents.clone(),
        };
        if let Err(e) = snapshot::save_json_atomic(&self.registry_path, &doc).await {
            warn!(error = %e, "Agents registry mirror write failed");
        }
    }

    async fn trace(&self, process_name: &str, data: Value) {
        self.memory
            .log_process(
                COORDINATOR_AGENT_ID,
                process_name,
                data,
                json!({"agent_id": COORDINATOR_AGENT_ID}),
            )
            .await;
    }
}
