//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mindx::domain::ports::{GenerationError, GenerationOptions, TextGenerator};
use mindx::services::{BeliefSystem, Coordinator, Guardian, IdManager, MemoryAgent};

/// Text generator that replays a scripted queue of responses, then reports
/// empty generations.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }

    pub fn ok(responses: Vec<String>) -> Arc<Self> {
        Self::new(responses.into_iter().map(Ok).collect())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
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

/// One fully wired test environment over a temp directory.
pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub beliefs: Arc<BeliefSystem>,
    pub memory: Arc<MemoryAgent>,
    pub ids: Arc<IdManager>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let beliefs = Arc::new(BeliefSystem::in_memory());
        let memory = Arc::new(MemoryAgent::new(dir.path().join("memory")));
        let ids = Arc::new(
            IdManager::open(
                "default_identity_manager",
                &dir.path().join("identity"),
                beliefs.clone(),
                memory.clone(),
            )
            .await
            .unwrap(),
        );
        Self {
            dir,
            beliefs,
            memory,
            ids,
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.dir.path().join("config/official_agents_registry.json")
    }

    pub async fn guardian(&self, challenge_expiry_seconds: i64) -> Guardian {
        Guardian::init(
            self.ids.clone(),
            self.memory.clone(),
            self.registry_path(),
            challenge_expiry_seconds,
        )
        .await
        .unwrap()
    }

    pub async fn coordinator(
        &self,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Arc<Coordinator> {
        Arc::new(
            Coordinator::open(
                self.ids.clone(),
                self.memory.clone(),
                generator,
                self.registry_path(),
            )
            .await,
        )
    }
}
