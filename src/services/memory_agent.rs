//! Process trace memory.
//!
//! Appends structured, timestamped JSON records under
//! `data/memory/<agent_id>/…`. Records are append-only and ordered by
//! wall-clock time within one agent directory; persistence failures are
//! logged and swallowed so tracing can never take an agent down.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::models::Interaction;

/// One structured trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub timestamp: DateTime<Utc>,
    pub process_name: String,
    pub data: Value,
    #[serde(default)]
    pub metadata: Value,
}

/// Aggregate view over the memory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStatistics {
    pub agent_count: usize,
    pub trace_count: usize,
    pub timestamp_memory_count: usize,
}

/// Append-only trace store rooted at `data/memory`.
pub struct MemoryAgent {
    base_dir: PathBuf,
}

impl MemoryAgent {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The agent's data directory, created on demand with owner-only
    /// permissions.
    pub async fn get_agent_data_directory(&self, agent_id: &str) -> PathBuf {
        let dir = self.base_dir.join(agent_id);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(agent_id, error = %e, "Failed to create agent data directory");
            return dir;
        }
        restrict_to_owner(&dir).await;
        dir
    }

    /// Append a process trace for an agent.
    pub async fn log_process(
        &self,
        agent_id: &str,
        process_name: &str,
        data: Value,
        metadata: Value,
    ) {
        let record = TraceRecord {
            timestamp: Utc::now(),
            process_name: process_name.to_string(),
            data,
            metadata,
        };
        let traces = self.get_agent_data_directory(agent_id).await.join("traces");
        self.append_record(&traces, &trace_file_name(&record), &record)
            .await;
    }

    /// Persist a completed interaction for later inspection.
    pub async fn save_interaction_memory(&self, agent_id: &str, interaction: &Interaction) {
        let dir = self
            .get_agent_data_directory(agent_id)
            .await
            .join("interactions");
        let name = format!(
            "{}.{}.interaction.json",
            file_stamp(interaction.created_at),
            interaction.id
        );
        self.append_record(&dir, &name, interaction).await;
    }

    /// Append a timestamped memory record under a scope.
    pub async fn save_timestamp_memory(&self, scope: &str, content: Value) {
        let record = TraceRecord {
            timestamp: Utc::now(),
            process_name: "timestamp_memory".to_string(),
            data: content,
            metadata: Value::Null,
        };
        let dir = self
            .get_agent_data_directory(scope)
            .await
            .join("timestamps");
        let name = format!("{}.memory.json", file_stamp(record.timestamp));
        self.append_record(&dir, &name, &record).await;
    }

    /// Most recent timestamp memories for a scope, newest first.
    pub async fn get_recent_timestamp_memories(
        &self,
        scope: &str,
        count: usize,
    ) -> Vec<TraceRecord> {
        let dir = self.base_dir.join(scope).join("timestamps");
        let mut names = match list_file_names(&dir).await {
            Some(names) => names,
            None => return Vec::new(),
        };
        // Stamped names sort chronologically; newest last.
        names.sort();
        let mut records = Vec::with_capacity(count);
        for name in names.into_iter().rev().take(count) {
            if let Ok(bytes) = tokio::fs::read(dir.join(&name)).await {
                if let Ok(record) = serde_json::from_slice::<TraceRecord>(&bytes) {
                    records.push(record);
                }
            }
        }
        records
    }

    /// Counts across the whole memory tree.
    pub async fn get_memory_statistics(&self) -> MemoryStatistics {
        let mut stats = MemoryStatistics::default();
        let agents = match list_file_names(&self.base_dir).await {
            Some(names) => names,
            None => return stats,
        };
        for agent in agents {
            let agent_dir = self.base_dir.join(&agent);
            if !agent_dir.is_dir() {
                continue;
            }
            stats.agent_count += 1;
            if let Some(traces) = list_file_names(&agent_dir.join("traces")).await {
                stats.trace_count += traces.len();
            }
            if let Some(memories) = list_file_names(&agent_dir.join("timestamps")).await {
                stats.timestamp_memory_count += memories.len();
            }
        }
        stats
    }

    async fn append_record<T: Serialize>(&self, dir: &Path, name: &str, record: &T) {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), error = %e, "Failed to create trace directory");
            return;
        }
        let path = dir.join(name);
        match serde_json::to_vec_pretty(record) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    warn!(path = %path.display(), error = %e, "Trace write failed");
                }
            }
            Err(e) => warn!(error = %e, "Trace serialization failed"),
        }
    }
}

fn file_stamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%S%.9fZ").to_string()
}

fn trace_file_name(record: &TraceRecord) -> String {
    format!(
        "{}.{}.trace.json",
        file_stamp(record.timestamp),
        record.process_name
    )
}

async fn list_file_names(dir: &Path) -> Option<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Some(names)
}

#[cfg(unix)]
async fn restrict_to_owner(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o700);
    if let Err(e) = tokio::fs::set_permissions(path, perms).await {
        warn!(path = %path.display(), error = %e, "Failed to restrict directory permissions");
    }
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) {}
