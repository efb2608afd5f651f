//! Command handlers.

pub mod agent;
pub mod audit;
pub mod coord;
pub mod identity;
pub mod mastermind;
pub mod run;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::domain::models::config::BdiConfig;
use crate::domain::models::Config;
use crate::domain::ports::{Searcher, TextGenerator};
use crate::infrastructure::llm::HttpTextGenerator;
use crate::infrastructure::web_search::HttpSearcher;
use crate::services::bdi::BdiAgent;
use crate::services::{
    BeliefSystem, Coordinator, Guardian, IdManager, Mastermind, MemoryAgent, PersonaStore,
    ToolRegistry,
};

/// Shared service graph built once per invocation.
pub struct AppContext {
    pub config: Config,
    pub beliefs: Arc<BeliefSystem>,
    pub memory: Arc<MemoryAgent>,
    pub ids: Arc<IdManager>,
    pub guardian: Arc<Guardian>,
    pub coordinator: Arc<Coordinator>,
    pub tools: Arc<ToolRegistry>,
    pub personas: Arc<PersonaStore>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub searcher: Option<Arc<dyn Searcher>>,
}

impl AppContext {
    /// Wire the service graph from configuration.
    pub async fn build(config: Config) -> Result<Self> {
        let data_dir = PathBuf::from(&config.data_dir);
        let beliefs = Arc::new(BeliefSystem::open(data_dir.join("beliefs.json")).await);
        let memory = Arc::new(MemoryAgent::new(data_dir.join("memory")));

        let ids = Arc::new(
            IdManager::open(
                "default_identity_manager",
                &data_dir.join("identity"),
                beliefs.clone(),
                memory.clone(),
            )
            .await
            .context("Failed to open identity manager")?,
        );

        let generator: Option<Arc<dyn TextGenerator>> = HttpTextGenerator::from_config(&config.llm)
            .map(|g| Arc::new(g) as Arc<dyn TextGenerator>);
        let searcher: Option<Arc<dyn Searcher>> = HttpSearcher::from_config(&config.search)
            .map(|s| Arc::new(s) as Arc<dyn Searcher>);

        let agents_registry_path = data_dir.join("config/official_agents_registry.json");
        let guardian = Arc::new(
            Guardian::init(
                ids.clone(),
                memory.clone(),
                agents_registry_path.clone(),
                config.guardian.challenge_expiry_seconds,
            )
            .await
            .context("Failed to initialize guardian")?,
        );

        let coordinator = Arc::new(
            Coordinator::open(
                ids.clone(),
                memory.clone(),
                generator.clone(),
                agents_registry_path,
            )
            .await,
        );

        let tools =
            Arc::new(ToolRegistry::open(data_dir.join("config/official_tools_registry.json")).await);
        let personas =
            Arc::new(PersonaStore::open(data_dir.join("memory/personas/personas.json")).await);

        Ok(Self {
            config,
            beliefs,
            memory,
            ids,
            guardian,
            coordinator,
            tools,
            personas,
            generator,
            searcher,
        })
    }

    /// Build a fresh BDI executor over the given belief domain.
    pub fn bdi(&self, domain: impl Into<String>) -> BdiAgent {
        BdiAgent::new(
            domain,
            self.beliefs.clone(),
            self.memory.clone(),
            self.generator.clone(),
            PathBuf::from(&self.config.data_dir).join("workspace"),
            self.bdi_config(),
        )
    }

    /// Build the Mastermind (its BDI is owned by the returned instance).
    pub async fn mastermind(&self) -> Result<Mastermind> {
        let bdi = self.bdi(format!(
            "mastermind_strategy_{}",
            crate::services::mastermind::MASTERMIND_AGENT_ID
        ));
        let data_dir = self
            .memory
            .get_agent_data_directory(crate::services::mastermind::MASTERMIND_AGENT_ID)
            .await;
        Mastermind::init(
            self.beliefs.clone(),
            self.memory.clone(),
            self.ids.clone(),
            self.coordinator.clone(),
            self.tools.clone(),
            self.generator.clone(),
            bdi,
            data_dir,
        )
        .await
        .context("Failed to initialize mastermind")
    }

    fn bdi_config(&self) -> BdiConfig {
        self.config.bdi.clone()
    }
}
