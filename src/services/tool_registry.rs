//! Tool catalog.
//!
//! Named tools with capability metadata, persisted to
//! `data/config/official_tools_registry.json`. Tools flagged
//! `needs_identity` get a wallet from the IDManager at registration time.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::domain::models::{RegistrationStatus, ToolRegistration, ToolsRegistryDoc};
use crate::domain::MindxResult;
use crate::infrastructure::snapshot;
use crate::services::IdManager;

/// Catalog of registered tools.
pub struct ToolRegistry {
    path: PathBuf,
    doc: Mutex<ToolsRegistryDoc>,
}

impl ToolRegistry {
    /// Open the registry, starting empty when no snapshot exists.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = snapshot::load_json(&path).await.unwrap_or_default();
        Self {
            path,
            doc: Mutex::new(doc),
        }
    }

    /// Register (or replace) a tool. Tools that need an identity get a
    /// wallet before the entry is persisted.
    pub async fn register_tool(
        &self,
        mut tool: ToolRegistration,
        id_manager: Option<&Arc<IdManager>>,
    ) -> MindxResult<ToolRegistration> {
        if tool.needs_identity && tool.identity.is_none() {
            if let Some(ids) = id_manager {
                let (address, _) = ids.create_new_wallet(&tool.tool_id).await?;
                tool.identity = Some(address);
            }
        }

        let mut doc = self.doc.lock().await;
        doc.registered_tools
            .insert(tool.tool_id.clone(), tool.clone());
        snapshot::save_json_atomic(&self.path, &*doc).await?;
        info!(tool_id = %tool.tool_id, "Tool registered");
        Ok(tool)
    }

    /// Remove a tool. Returns whether it existed.
    pub async fn unregister_tool(&self, tool_id: &str) -> MindxResult<bool> {
        let mut doc = self.doc.lock().await;
        let existed = doc.registered_tools.remove(tool_id).is_some();
        if existed {
            snapshot::save_json_atomic(&self.path, &*doc).await?;
        }
        Ok(existed)
    }

    /// Flip a tool's status.
    pub async fn set_status(&self, tool_id: &str, status: RegistrationStatus) -> MindxResult<bool> {
        let mut doc = self.doc.lock().await;
        let Some(tool) = doc.registered_tools.get_mut(tool_id) else {
            return Ok(false);
        };
        tool.status = status;
        snapshot::save_json_atomic(&self.path, &*doc).await?;
        Ok(true)
    }

    /// Copy of one tool entry.
    pub async fn get(&self, tool_id: &str) -> Option<ToolRegistration> {
        self.doc.lock().await.registered_tools.get(tool_id).cloned()
    }

    /// All tools, in id order.
    pub async fn list(&self) -> Vec<ToolRegistration> {
        self.doc.lock().await.registered_tools.values().cloned().collect()
    }

    /// Tools advertising a capability.
    pub async fn find_by_capability(&self, capability: &str) -> Vec<ToolRegistration> {
        self.doc
            .lock()
            .await
            .registered_tools
            .values()
            .filter(|t| t.capabilities.iter().any(|c| c == capability))
            .cloned()
            .collect()
    }
}
