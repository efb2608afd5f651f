//! Persona storage and generation.
//!
//! The `introspect` command asks the text generator for a new persona and
//! persists it here; Mastermind seeds its BDI with the `MASTERMIND` persona
//! when one exists.

use std::collections::BTreeMap;
use std::path::PathBuf;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::domain::ports::{GenerationOptions, TextGenerator};
use crate::domain::{MindxError, MindxResult};
use crate::infrastructure::snapshot;

/// Role name Mastermind looks up at startup.
pub const MASTERMIND_PERSONA: &str = "MASTERMIND";

/// Persisted map of role -> persona text.
pub struct PersonaStore {
    path: PathBuf,
    personas: Mutex<BTreeMap<String, String>>,
}

impl PersonaStore {
    /// Open the store, starting empty when no snapshot exists.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let personas = snapshot::load_json(&path).await.unwrap_or_default();
        Self {
            path,
            personas: Mutex::new(personas),
        }
    }

    /// Stored persona for a role.
    pub async fn get_persona(&self, role: &str) -> Option<String> {
        self.personas.lock().await.get(role).cloned()
    }

    /// All stored roles.
    pub async fn list_roles(&self) -> Vec<String> {
        self.personas.lock().await.keys().cloned().collect()
    }

    /// Store a persona verbatim.
    pub async fn set_persona(&self, role: &str, persona: &str) -> MindxResult<()> {
        let mut personas = self.personas.lock().await;
        personas.insert(role.to_string(), persona.to_string());
        snapshot::save_json_atomic(&self.path, &*personas).await
    }

    /// Generate a fresh persona for a role from a directive and store it.
    pub async fn generate_persona(
        &self,
        generator: &Arc<dyn TextGenerator>,
        role: &str,
        directive: &str,
    ) -> MindxResult<String> {
        let prompt = format!(
            "Write a concise operating persona for an autonomous agent in the role \
             '{role}'. The persona must directly serve this directive: {directive}. \
             Respond with the persona text only."
        );
        let persona = generator
            .generate(&prompt, GenerationOptions::default())
            .await
            .map_err(|e| MindxError::ExecutionFailed(format!("persona generation: {e}")))?;

        self.set_persona(role, &persona).await?;
        info!(role, "Stored generated persona");
        Ok(persona)
    }
}
