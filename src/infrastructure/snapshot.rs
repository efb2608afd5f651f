//! Atomic JSON snapshot persistence.
//!
//! Every persisted document (beliefs, registries, campaign history) is
//! written via write-to-temp-then-rename so a crash can never leave a torn
//! file behind. Load tolerates missing or corrupt snapshots by reporting
//! `None`; callers start empty.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::domain::{MindxError, MindxResult};

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub async fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> MindxResult<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| MindxError::PersistenceIo(format!("serialize {}: {e}", path.display())))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MindxError::PersistenceIo(format!("mkdir {}: {e}", parent.display())))?;
    }

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| MindxError::PersistenceIo(format!("write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| MindxError::PersistenceIo(format!("rename {}: {e}", path.display())))?;
    Ok(())
}

/// Load a JSON document, returning `None` when the file is missing or does
/// not parse. Corruption is logged, not raised.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(_) => return None,
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Snapshot corrupt; starting empty");
            None
        }
    }
}
