//! Shared belief store with provenance.
//!
//! One instance per process, shared via `Arc`. All writes are serialized
//! behind a single mutex and reads hand out copies, so no caller can alias
//! the stored map. When a persistence path is configured every mutation
//! rewrites the JSON snapshot atomically; persistence failures are logged
//! and swallowed, beliefs stay in memory.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::models::{Belief, BeliefSource};
use crate::infrastructure::snapshot;

/// Process-wide belief store.
pub struct BeliefSystem {
    beliefs: Mutex<HashMap<String, Belief>>,
    persistence_path: Option<PathBuf>,
}

impl BeliefSystem {
    /// Create an in-memory belief system with no persistence.
    pub fn in_memory() -> Self {
        Self {
            beliefs: Mutex::new(HashMap::new()),
            persistence_path: None,
        }
    }

    /// Open a belief system backed by a JSON snapshot.
    ///
    /// A missing or corrupt snapshot starts empty.
    pub async fn open(persistence_path: PathBuf) -> Self {
        let beliefs: HashMap<String, Belief> = snapshot::load_json(&persistence_path)
            .await
            .unwrap_or_default();
        debug!(
            path = %persistence_path.display(),
            count = beliefs.len(),
            "Belief snapshot loaded"
        );
        Self {
            beliefs: Mutex::new(beliefs),
            persistence_path: Some(persistence_path),
        }
    }

    /// Upsert a belief. Confidence is clamped; `created_at` is preserved on
    /// update.
    pub async fn add_belief(
        &self,
        key: &str,
        value: Value,
        confidence: f64,
        source: BeliefSource,
    ) {
        let mut map = self.beliefs.lock().await;
        match map.get_mut(key) {
            Some(existing) => existing.update(value, confidence, source),
            None => {
                map.insert(key.to_string(), Belief::new(value, confidence, source));
            }
        }
        self.persist(&map).await;
    }

    /// Identical to [`add_belief`](Self::add_belief); kept as a separate
    /// name for call-site clarity.
    pub async fn update_belief(
        &self,
        key: &str,
        value: Value,
        confidence: f64,
        source: BeliefSource,
    ) {
        self.add_belief(key, value, confidence, source).await;
    }

    /// Copy of the belief at `key`, if present.
    pub async fn get_belief(&self, key: &str) -> Option<Belief> {
        self.beliefs.lock().await.get(key).cloned()
    }

    /// The belief's value, or `default` when absent.
    pub async fn get_belief_value(&self, key: &str, default: Value) -> Value {
        match self.get_belief(key).await {
            Some(b) => b.value,
            None => default,
        }
    }

    /// Remove a belief. Returns whether it existed.
    pub async fn remove_belief(&self, key: &str) -> bool {
        let mut map = self.beliefs.lock().await;
        let existed = map.remove(key).is_some();
        if existed {
            self.persist(&map).await;
        }
        existed
    }

    /// Prefix query with confidence and source filters. Results are copies,
    /// sorted by key for deterministic output.
    pub async fn query_beliefs(
        &self,
        partial_key: &str,
        min_confidence: f64,
        source: Option<BeliefSource>,
    ) -> Vec<(String, Belief)> {
        let map = self.beliefs.lock().await;
        let mut results: Vec<(String, Belief)> = map
            .iter()
            .filter(|(key, belief)| {
                key.starts_with(partial_key)
                    && belief.confidence >= min_confidence
                    && source.is_none_or(|s| belief.source == s)
            })
            .map(|(key, belief)| (key.clone(), belief.clone()))
            .collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    /// Deep copy of the full map.
    pub async fn get_all_beliefs(&self) -> HashMap<String, Belief> {
        self.beliefs.lock().await.clone()
    }

    async fn persist(&self, map: &HashMap<String, Belief>) {
        if let Some(path) = &self.persistence_path {
            if let Err(e) = snapshot::save_json_atomic(path, map).await {
                warn!(path = %path.display(), error = %e, "Belief snapshot write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_then_get() {
        let bs = BeliefSystem::in_memory();
        bs.add_belief("weather", json!("sunny"), 0.9, BeliefSource::Perception)
            .await;

        let b = bs.get_belief("weather").await.unwrap();
        assert_eq!(b.value, json!("sunny"));
        assert_eq!(b.confidence, 0.9);
        assert_eq!(b.source, BeliefSource::Perception);
    }

    #[tokio::test]
    async fn test_confidence_clamped_on_write() {
        let bs = BeliefSystem::in_memory();
        bs.add_belief("k", json!(1), 3.0, BeliefSource::Default).await;
        assert_eq!(bs.get_belief("k").await.unwrap().confidence, 1.0);

        bs.add_belief("k", json!(1), -1.0, BeliefSource::Default).await;
        assert_eq!(bs.get_belief("k").await.unwrap().confidence, 0.0);
    }

    #[tokio::test]
    async fn test_update_preserves_created_at() {
        let bs = BeliefSystem::in_memory();
        bs.add_belief("k", json!(1), 0.5, BeliefSource::Default).await;
        let created = bs.get_belief("k").await.unwrap().created_at;

        bs.update_belief("k", json!(2), 0.8, BeliefSource::Inference)
            .await;
        let b = bs.get_belief("k").await.unwrap();
        assert_eq!(b.created_at, created);
        assert_eq!(b.value, json!(2));
    }

    #[tokio::test]
    async fn test_get_belief_value_default() {
        let bs = BeliefSystem::in_memory();
        assert_eq!(
            bs.get_belief_value("missing", json!("fallback")).await,
            json!("fallback")
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let bs = BeliefSystem::in_memory();
        bs.add_belief("k", json!(1), 1.0, BeliefSource::Default).await;
        assert!(bs.remove_belief("k").await);
        assert!(!bs.remove_belief("k").await);
        assert!(bs.get_belief("k").await.is_none());
    }

    #[tokio::test]
    async fn test_query_prefix_and_filters() {
        let bs = BeliefSystem::in_memory();
        bs.add_belief("identity.map.a", json!(1), 0.9, BeliefSource::Derived)
            .await;
        bs.add_belief("identity.map.b", json!(2), 0.3, BeliefSource::Derived)
            .await;
        bs.add_belief("other.c", json!(3), 1.0, BeliefSource::Perception)
            .await;

        let all = bs.query_beliefs("identity.map.", 0.0, None).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, "identity.map.a");

        let confident = bs.query_beliefs("identity.map.", 0.5, None).await;
        assert_eq!(confident.len(), 1);

        let derived = bs
            .query_beliefs("", 0.0, Some(BeliefSource::Derived))
            .await;
        assert_eq!(derived.len(), 2);
    }

    #[tokio::test]
    async fn test_reads_return_copies() {
        let bs = BeliefSystem::in_memory();
        bs.add_belief("k", json!({"n": 1}), 1.0, BeliefSource::Default)
            .await;
        let mut copy = bs.get_belief("k").await.unwrap();
        copy.value = json!({"n": 999});
        // The store is unaffected by mutating the copy.
        assert_eq!(bs.get_belief("k").await.unwrap().value, json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beliefs.json");

        {
            let bs = BeliefSystem::open(path.clone()).await;
            bs.add_belief("a", json!("x"), 0.7, BeliefSource::Learned).await;
            bs.add_belief("b", json!([1, 2]), 1.0, BeliefSource::Derived)
                .await;
        }

        let reloaded = BeliefSystem::open(path).await;
        let all = reloaded.get_all_beliefs().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"].value, json!("x"));
        assert_eq!(all["a"].confidence, 0.7);
        assert_eq!(all["b"].source, BeliefSource::Derived);
    }
}
