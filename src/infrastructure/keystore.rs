//! Sealed key-store file.
//!
//! Private keys live in a single dotenv-style file (`KEY_VAR=hex` lines)
//! with owner-only permissions: the file is created 0600 inside a 0700
//! directory. The store is rewritten atomically on every mutation and is
//! only ever read by the IDManager.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{MindxError, MindxResult};

/// Name of the sealed key file inside the identity directory.
pub const KEY_FILE_NAME: &str = ".wallet_keys.env";

/// Owner-only key/value file holding hex private keys.
///
/// Not internally synchronized; the IDManager serializes access behind its
/// own lock.
#[derive(Debug)]
pub struct SealedKeyStore {
    path: PathBuf,
}

impl SealedKeyStore {
    /// Open (creating if needed) the sealed store under `identity_dir`.
    pub async fn open(identity_dir: &Path) -> MindxResult<Self> {
        tokio::fs::create_dir_all(identity_dir)
            .await
            .map_err(|e| MindxError::KeyStoreIo(format!("mkdir {}: {e}", identity_dir.display())))?;
        set_mode(identity_dir, 0o700).await?;

        let path = identity_dir.join(KEY_FILE_NAME);
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| MindxError::KeyStoreIo(e.to_string()))?
        {
            set_mode(&path, 0o600).await?;
        } else {
            tokio::fs::write(&path, b"")
                .await
                .map_err(|e| MindxError::KeyStoreIo(format!("create {}: {e}", path.display())))?;
            set_mode(&path, 0o600).await?;
            debug!(path = %path.display(), "Created sealed key store");
        }
        Ok(Self { path })
    }

    /// Path of the sealed file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one key by variable name.
    pub async fn get(&self, var_name: &str) -> MindxResult<Option<String>> {
        Ok(self.read_all().await?.get(var_name).cloned())
    }

    /// Insert or replace a key, rewriting the file atomically.
    pub async fn set(&self, var_name: &str, value: &str) -> MindxResult<()> {
        let mut entries = self.read_all().await?;
        entries.insert(var_name.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    /// Remove a key. Returns whether it existed.
    pub async fn remove(&self, var_name: &str) -> MindxResult<bool> {
        let mut entries = self.read_all().await?;
        let existed = entries.remove(var_name).is_some();
        if existed {
            self.write_all(&entries).await?;
        }
        Ok(existed)
    }

    /// All variable names currently sealed.
    pub async fn var_names(&self) -> MindxResult<Vec<String>> {
        Ok(self.read_all().await?.into_keys().collect())
    }

    async fn read_all(&self) -> MindxResult<BTreeMap<String, String>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| MindxError::KeyStoreIo(format!("read {}: {e}", self.path.display())))?;
        let mut entries = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = line.split_once('=') {
                entries.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
        Ok(entries)
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> MindxResult<()> {
        let mut content = String::new();
        for (k, v) in entries {
            content.push_str(k);
            content.push('=');
            content.push_str(v);
            content.push('\n');
        }
        let tmp = self.path.with_extension("env.tmp");
        tokio::fs::write(&tmp, content.as_bytes())
            .await
            .map_err(|e| MindxError::KeyStoreIo(format!("write {}: {e}", tmp.display())))?;
        set_mode(&tmp, 0o600).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| MindxError::KeyStoreIo(format!("rename {}: {e}", self.path.display())))?;
        Ok(())
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> MindxResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(mode);
    tokio::fs::set_permissions(path, perms)
        .await
        .map_err(|e| MindxError::KeyStoreIo(format!("chmod {}: {e}", path.display())))
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> MindxResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = SealedKeyStore::open(dir.path()).await.unwrap();

        assert_eq!(store.get("MINDX_WALLET_PK_A").await.unwrap(), None);
        store.set("MINDX_WALLET_PK_A", "deadbeef").await.unwrap();
        assert_eq!(
            store.get("MINDX_WALLET_PK_A").await.unwrap(),
            Some("deadbeef".to_string())
        );

        assert!(store.remove("MINDX_WALLET_PK_A").await.unwrap());
        assert!(!store.remove("MINDX_WALLET_PK_A").await.unwrap());
        assert_eq!(store.get("MINDX_WALLET_PK_A").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multiple_entries_survive_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = SealedKeyStore::open(dir.path()).await.unwrap();
        store.set("K1", "aa").await.unwrap();
        store.set("K2", "bb").await.unwrap();
        store.set("K1", "cc").await.unwrap();

        assert_eq!(store.get("K1").await.unwrap(), Some("cc".into()));
        assert_eq!(store.get("K2").await.unwrap(), Some("bb".into()));
        let mut names = store.var_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["K1", "K2"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = SealedKeyStore::open(dir.path()).await.unwrap();
        store.set("K", "aa").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_reopen_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SealedKeyStore::open(dir.path()).await.unwrap();
            store.set("K", "aa").await.unwrap();
        }
        let store = SealedKeyStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get("K").await.unwrap(), Some("aa".into()));
    }
}
