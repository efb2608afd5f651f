//! Security layer: agent admission and private-key release.
//!
//! The Guardian admits new agents via a four-step validation (identity,
//! registry, challenge-response, workspace) and is the single sanctioned
//! egress for private keys. Challenges are single-use: release attempts
//! consume them whether or not they succeed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::models::{AgentsRegistryDoc, Challenge};
use crate::domain::MindxResult;
use crate::infrastructure::snapshot;
use crate::services::{IdManager, MemoryAgent};

/// Entity id of the Guardian's own identity.
pub const GUARDIAN_AGENT_ID: &str = "guardian_agent_main";

/// Outcome of one validation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Passed,
    Failed,
}

/// One recorded validation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub check_type: String,
    pub status: CheckStatus,
    pub details: String,
}

/// Overall status of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Pending,
    Passed,
    Failed,
    Error,
}

/// Full report of an admission attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub agent_id: String,
    pub public_address: String,
    pub workspace_path: String,
    pub checks_performed: Vec<ValidationCheck>,
    pub validation_status: ValidationStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub validated_at: chrono::DateTime<Utc>,
}

impl ValidationReport {
    fn new(agent_id: &str, public_address: &str, workspace_path: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            public_address: public_address.to_string(),
            workspace_path: workspace_path.to_string(),
            checks_performed: Vec::new(),
            validation_status: ValidationStatus::Pending,
            failure_reason: None,
            validated_at: Utc::now(),
        }
    }

    fn record(&mut self, check_type: &str, passed: bool, details: String) {
        self.checks_performed.push(ValidationCheck {
            check_type: check_type.to_string(),
            status: if passed {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            details,
        });
    }

    fn fail(&mut self, reason: &str) {
        self.validation_status = ValidationStatus::Failed;
        self.failure_reason = Some(reason.to_string());
    }
}

/// Admission control and key custody gate.
pub struct Guardian {
    id_manager: Arc<IdManager>,
    memory: Arc<MemoryAgent>,
    challenges: Mutex<HashMap<String, Challenge>>,
    challenge_expiry_seconds: i64,
    registry_path: PathBuf,
}

impl Guardian {
    /// Create the Guardian and establish its own identity.
    pub async fn init(
        id_manager: Arc<IdManager>,
        memory: Arc<MemoryAgent>,
        registry_path: impl Into<PathBuf>,
        challenge_expiry_seconds: i64,
    ) -> MindxResult<Self> {
        id_manager.create_new_wallet(GUARDIAN_AGENT_ID).await?;
        let guardian = Self {
            id_manager,
            memory,
            challenges: Mutex::new(HashMap::new()),
            challenge_expiry_seconds,
            registry_path: registry_path.into(),
        };
        guardian
            .trace("guardian_initialization", json!({"status": "initialized"}))
            .await;
        info!("Guardian initialized");
        Ok(guardian)
    }

    /// Issue a new challenge for an entity, evicting any prior one.
    pub async fn get_challenge(&self, agent_id: &str) -> String {
        let challenge = Challenge::issue(agent_id);
        let nonce = challenge.nonce.clone();
        self.challenges
            .lock()
            .await
            .insert(agent_id.to_string(), challenge);
        info!(agent_id, "Issued new challenge");
        nonce
    }

    /// Four-step admission validation. Each step's pass/fail lands in the
    /// report; the first gating failure short-circuits.
    pub async fn validate_new_agent(
        &self,
        agent_id: &str,
        public_address: &str,
        workspace_path: &str,
    ) -> (bool, ValidationReport) {
        let mut report = ValidationReport::new(agent_id, public_address, workspace_path);

        // 1. Identity: the claimed address must match the custodied one.
        let identity_ok = self.id_manager.get_public_address(agent_id).await.as_deref()
            == Some(public_address);
        report.record(
            "identity_validation",
            identity_ok,
            format!("Identity validation for {agent_id}"),
        );
        if !identity_ok {
            report.fail("Identity validation failed");
            self.log_validation(&report).await;
            return (false, report);
        }

        // 2. Registry: listed, enabled, and carrying an identity.
        let registry_ok = self.registry_admits(agent_id).await;
        report.record(
            "registry_validation",
            registry_ok,
            format!("Registry validation for {agent_id}"),
        );
        if !registry_ok {
            report.fail("Registry validation failed");
            self.log_validation(&report).await;
            return (false, report);
        }

        // 3. Challenge-response over a fresh nonce.
        let challenge_ok = self.challenge_response_test(agent_id, public_address).await;
        report.record(
            "challenge_response",
            challenge_ok,
            format!("Challenge-response test for {agent_id}"),
        );
        if !challenge_ok {
            report.fail("Challenge-response test failed");
            self.log_validation(&report).await;
            return (false, report);
        }

        // 4. Workspace must exist and be a directory.
        let workspace_ok = Path::new(workspace_path).is_dir();
        report.record(
            "workspace_validation",
            workspace_ok,
            format!("Workspace validation for {workspace_path}"),
        );
        if !workspace_ok {
            report.fail("Workspace validation failed");
            self.log_validation(&report).await;
            return (false, report);
        }

        report.validation_status = ValidationStatus::Passed;
        self.log_validation(&report).await;
        info!(agent_id, "Agent validation successful");
        (true, report)
    }

    /// Sign a production approval: `"APPROVED:<agent_id>:<unix_ts>"`.
    pub async fn approve_agent_for_production(
        &self,
        agent_id: &str,
        report: &ValidationReport,
    ) -> MindxResult<String> {
        let approved_at = Utc::now().timestamp();
        let approval_message = format!("APPROVED:{agent_id}:{approved_at}");
        let signature = self
            .id_manager
            .sign_message(GUARDIAN_AGENT_ID, &approval_message)
            .await?;

        self.trace(
            "agent_production_approval",
            json!({
                "approved_agent": agent_id,
                "approval_timestamp": approved_at,
                "validation_reference": report.validated_at,
                "signature": signature,
            }),
        )
        .await;
        info!(agent_id, "Agent approved for production");
        Ok(signature)
    }

    /// Proof of key existence: the public address for an entity, if any.
    pub async fn retrieve_public_key(&self, entity_id: &str) -> Option<String> {
        self.id_manager.get_public_address(entity_id).await
    }

    /// The only sanctioned private-key egress.
    ///
    /// Verifies the signed challenge and releases the key on success. The
    /// challenge is deleted no matter the outcome, so a second attempt with
    /// the same nonce always denies.
    pub async fn get_private_key(
        &self,
        requesting_agent_id: &str,
        challenge: &str,
        signature: &str,
    ) -> Option<String> {
        let valid = self.take_and_check_challenge(requesting_agent_id, challenge).await;
        if !valid {
            self.trace(
                "guardian_key_release_denied",
                json!({"agent_id": requesting_agent_id, "reason": "challenge_invalid"}),
            )
            .await;
            return None;
        }

        let Some(public_address) = self.retrieve_public_key(requesting_agent_id).await else {
            warn!(requesting_agent_id, "No public key found for entity");
            self.trace(
                "guardian_key_release_denied",
                json!({"agent_id": requesting_agent_id, "reason": "no_identity"}),
            )
            .await;
            return None;
        };

        if self
            .id_manager
            .verify_signature(&public_address, challenge, signature)
        {
            info!(requesting_agent_id, "Signature verified; releasing private key");
            self.trace(
                "guardian_key_release_granted",
                json!({"agent_id": requesting_agent_id}),
            )
            .await;
            self.id_manager
                .private_key_for_guardian(requesting_agent_id)
                .await
        } else {
            warn!(requesting_agent_id, "Signature verification failed; access denied");
            self.trace(
                "guardian_key_release_denied",
                json!({"agent_id": requesting_agent_id, "reason": "bad_signature"}),
            )
            .await;
            None
        }
    }

    /// Remove the stored challenge and report whether it matched `provided`
    /// and was still fresh. Expired or mismatched challenges are dropped.
    async fn take_and_check_challenge(&self, agent_id: &str, provided: &str) -> bool {
        let mut challenges = self.challenges.lock().await;
        let Some(stored) = challenges.remove(agent_id) else {
            warn!(agent_id, "No challenge found for agent");
            return false;
        };
        if stored.nonce != provided {
            warn!(agent_id, "Invalid challenge provided");
            return false;
        }
        if stored.is_expired(Utc::now(), self.challenge_expiry_seconds) {
            warn!(agent_id, "Challenge expired");
            return false;
        }
        true
    }

    /// Real round trip: issue a nonce, have the entity's sealed key sign it,
    /// and verify the recovered signer.
    async fn challenge_response_test(&self, agent_id: &str, public_address: &str) -> bool {
        let nonce = Challenge::issue(agent_id).nonce;
        match self.id_manager.sign_message(agent_id, &nonce).await {
            Ok(signature) => self
                .id_manager
                .verify_signature(public_address, &nonce, &signature),
            Err(e) => {
                warn!(agent_id, error = %e, "Challenge-response signing failed");
                false
            }
        }
    }

    async fn registry_admits(&self, agent_id: &str) -> bool {
        let Some(doc) = snapshot::load_json::<AgentsRegistryDoc>(&self.registry_path).await else {
            warn!(path = %self.registry_path.display(), "Agents registry not found");
            return false;
        };
        match doc.registered_agents.get(agent_id) {
            Some(entry) => entry.is_admissible(),
            None => {
                warn!(agent_id, "Agent not found in registry");
                false
            }
        }
    }

    async fn log_validation(&self, report: &ValidationReport) {
        self.trace(
            "agent_validation",
            serde_json::to_value(report).unwrap_or_else(|_| json!({})),
        )
        .await;
    }

    async fn trace(&self, process_name: &str, data: serde_json::Value) {
        self.memory
            .log_process(
                GUARDIAN_AGENT_ID,
                process_name,
                data,
                json!({"agent_id": GUARDIAN_AGENT_ID}),
            )
            .await;
    }
}

// Expired-challenge cleanup happens lazily at release time; issuing a new
// challenge for the same entity also evicts the old one.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentRegistration;
    use crate::domain::models::RegistrationStatus;
    use crate::services::BeliefSystem;

    struct Fixture {
        _dir: tempfile::TempDir,
        ids: Arc<IdManager>,
        guardian: Guardian,
        registry_path: PathBuf,
        workspace: PathBuf,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let beliefs = Arc::new(BeliefSystem::in_memory());
        let memory = Arc::new(MemoryAgent::new(dir.path().join("memory")));
        let ids = Arc::new(
            IdManager::open(
                "id_manager_test",
                &dir.path().join("identity"),
                beliefs,
                memory.clone(),
            )
            .await
            .unwrap(),
        );
        let registry_path = dir.path().join("config/official_agents_registry.json");
        let workspace = dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        let guardian = Guardian::init(ids.clone(), memory, registry_path.clone(), 300)
            .await
            .unwrap();
        Fixture {
            _dir: dir,
            ids,
            guardian,
            registry_path,
            workspace,
        }
    }

    async fn register(fx: &Fixture, agent_id: &str, address: &str, enabled: bool) {
        let mut doc = snapshot::load_json::<AgentsRegistryDoc>(&fx.registry_path)
            .await
            .unwrap_or_default();
        let mut reg = AgentRegistration::new(agent_id, "worker", "test agent");
        reg.public_address = Some(address.to_string());
        reg.enabled = enabled;
        reg.status = RegistrationStatus::Registered;
        doc.registered_agents.insert(agent_id.to_string(), reg);
        snapshot::save_json_atomic(&fx.registry_path, &doc)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_admission_passes() {
        let fx = fixture().await;
        let (address, _) = fx.ids.create_new_wallet("test_agent_1").await.unwrap();
        register(&fx, "test_agent_1", &address, true).await;

        let (ok, report) = fx
            .guardian
            .validate_new_agent("test_agent_1", &address, fx.workspace.to_str().unwrap())
            .await;
        assert!(ok, "report: {report:?}");
        assert_eq!(report.validation_status, ValidationStatus::Passed);
        assert_eq!(report.checks_performed.len(), 4);
        assert!(report
            .checks_performed
            .iter()
            .all(|c| c.status == CheckStatus::Passed));
    }

    #[tokio::test]
    async fn test_identity_mismatch_fails_first() {
        let fx = fixture().await;
        fx.ids.create_new_wallet("a").await.unwrap();

        let (ok, report) = fx
            .guardian
            .validate_new_agent("a", "0x0000000000000000000000000000000000000000", "/tmp")
            .await;
        assert!(!ok);
        assert_eq!(report.validation_status, ValidationStatus::Failed);
        assert_eq!(report.checks_performed.len(), 1);
        assert_eq!(report.failure_reason.as_deref(), Some("Identity validation failed"));
    }

    #[tokio::test]
    async fn test_disabled_agent_denied() {
        let fx = fixture().await;
        let (address, _) = fx.ids.create_new_wallet("d").await.unwrap();
        register(&fx, "d", &address, false).await;

        let (ok, report) = fx
            .guardian
            .validate_new_agent("d", &address, fx.workspace.to_str().unwrap())
            .await;
        assert!(!ok);
        assert_eq!(report.failure_reason.as_deref(), Some("Registry validation failed"));
    }

    #[tokio::test]
    async fn test_missing_workspace_fails_last() {
        let fx = fixture().await;
        let (address, _) = fx.ids.create_new_wallet("w").await.unwrap();
        register(&fx, "w", &address, true).await;

        let (ok, report) = fx
            .guardian
            .validate_new_agent("w", &address, "/definitely/not/a/dir")
            .await;
        assert!(!ok);
        assert_eq!(report.checks_performed.len(), 4);
        assert_eq!(report.failure_reason.as_deref(), Some("Workspace validation failed"));
    }

    #[tokio::test]
    async fn test_private_key_release_consumes_challenge() {
        let fx = fixture().await;
        fx.ids.create_new_wallet("requester").await.unwrap();

        let nonce = fx.guardian.get_challenge("requester").await;
        let signature = fx.ids.sign_message("requester", &nonce).await.unwrap();

        let key = fx
            .guardian
            .get_private_key("requester", &nonce, &signature)
            .await;
        assert!(key.is_some());

        // Challenge consumed: the same nonce no longer works.
        let again = fx
            .guardian
            .get_private_key("requester", &nonce, &signature)
            .await;
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_bad_signature_consumes_challenge_and_denies() {
        let fx = fixture().await;
        fx.ids.create_new_wallet("requester").await.unwrap();
        fx.ids.create_new_wallet("impostor").await.unwrap();

        let nonce = fx.guardian.get_challenge("requester").await;
        // Signed by the wrong key.
        let bad_signature = fx.ids.sign_message("impostor", &nonce).await.unwrap();

        let key = fx
            .guardian
            .get_private_key("requester", &nonce, &bad_signature)
            .await;
        assert!(key.is_none());

        // Even a correct signature now fails: the challenge is gone.
        let good_signature = fx.ids.sign_message("requester", &nonce).await.unwrap();
        let key = fx
            .guardian
            .get_private_key("requester", &nonce, &good_signature)
            .await;
        assert!(key.is_none());
    }

    #[tokio::test]
    async fn test_new_challenge_evicts_prior() {
        let fx = fixture().await;
        fx.ids.create_new_wallet("requester").await.unwrap();

        let first = fx.guardian.get_challenge("requester").await;
        let second = fx.guardian.get_challenge("requester").await;
        assert_ne!(first, second);

        let signature = fx.ids.sign_message("requester", &first).await.unwrap();
        // The first nonce was evicted by the second.
        assert!(fx
            .guardian
            .get_private_key("requester", &first, &signature)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_approval_signature_verifies() {
        let fx = fixture().await;
        let (address, _) = fx.ids.create_new_wallet("prod_agent").await.unwrap();
        register(&fx, "prod_agent", &address, true).await;

        let (ok, report) = fx
            .guardian
            .validate_new_agent("prod_agent", &address, fx.workspace.to_str().unwrap())
            .await;
        assert!(ok);

        let signature = fx
            .guardian
            .approve_agent_for_production("prod_agent", &report)
            .await
            .unwrap();
        assert_eq!(signature.len(), 130);
    }
}
