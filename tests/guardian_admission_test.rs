//! End-to-end admission: registry-backed validation, challenge-response,
//! and the single sanctioned private-key release path.

mod common;

use common::TestEnv;
use mindx::domain::models::{AgentRegistration, AgentsRegistryDoc, RegistrationStatus};
use mindx::infrastructure::snapshot;

async fn register_in_registry(env: &TestEnv, agent_id: &str, address: &str, enabled: bool) {
    let mut doc = snapshot::load_json::<AgentsRegistryDoc>(&env.registry_path())
        .await
        .unwrap_or_default();
    let mut registration = AgentRegistration::new(agent_id, "worker", "integration test agent");
    registration.public_address = Some(address.to_string());
    registration.enabled = enabled;
    registration.status = if enabled {
        RegistrationStatus::Registered
    } else {
        RegistrationStatus::Disabled
    };
    doc.registered_agents
        .insert(agent_id.to_string(), registration);
    snapshot::save_json_atomic(&env.registry_path(), &doc)
        .await
        .unwrap();
}

#[tokio::test]
async fn admission_of_a_new_agent() {
    let env = TestEnv::new().await;
    let guardian = env.guardian(300).await;

    // Precondition: test_agent_1 is registered and enabled with a key.
    let (address, _) = env.ids.create_new_wallet("test_agent_1").await.unwrap();
    register_in_registry(&env, "test_agent_1", &address, true).await;
    let workspace = env.dir.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();

    // Validation: all four checks pass.
    let (ok, report) = guardian
        .validate_new_agent("test_agent_1", &address, workspace.to_str().unwrap())
        .await;
    assert!(ok, "report: {report:?}");
    assert_eq!(report.checks_performed.len(), 4);

    // Challenge-response key release succeeds exactly once.
    let nonce = guardian.get_challenge("test_agent_1").await;
    let signature = env.ids.sign_message("test_agent_1", &nonce).await.unwrap();

    let released = guardian
        .get_private_key("test_agent_1", &nonce, &signature)
        .await;
    assert!(released.is_some());

    // The challenge was consumed: a second attempt with the same nonce
    // returns nothing.
    let second = guardian
        .get_private_key("test_agent_1", &nonce, &signature)
        .await;
    assert!(second.is_none());
}

#[tokio::test]
async fn released_key_matches_sealed_key() {
    let env = TestEnv::new().await;
    let guardian = env.guardian(300).await;
    env.ids.create_new_wallet("requester").await.unwrap();

    let nonce = guardian.get_challenge("requester").await;
    let signature = env.ids.sign_message("requester", &nonce).await.unwrap();
    let released = guardian
        .get_private_key("requester", &nonce, &signature)
        .await
        .unwrap();

    // The released key is exactly the hex blob sealed in the store.
    let sealed = std::fs::read_to_string(env.dir.path().join("identity/.wallet_keys.env")).unwrap();
    assert!(sealed.contains(&released));
}

#[tokio::test]
async fn disabled_registry_entry_denies_admission() {
    let env = TestEnv::new().await;
    let guardian = env.guardian(300).await;

    let (address, _) = env.ids.create_new_wallet("disabled_agent").await.unwrap();
    register_in_registry(&env, "disabled_agent", &address, false).await;
    let workspace = env.dir.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();

    let (ok, report) = guardian
        .validate_new_agent("disabled_agent", &address, workspace.to_str().unwrap())
        .await;
    assert!(!ok);
    assert_eq!(
        report.failure_reason.as_deref(),
        Some("Registry validation failed")
    );
}

#[tokio::test]
async fn unregistered_agent_denied() {
    let env = TestEnv::new().await;
    let guardian = env.guardian(300).await;

    let (address, _) = env.ids.create_new_wallet("ghost").await.unwrap();
    let workspace = env.dir.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();

    let (ok, _report) = guardian
        .validate_new_agent("ghost", &address, workspace.to_str().unwrap())
        .await;
    assert!(!ok);
}

#[tokio::test]
async fn expired_challenge_denies_release() {
    let env = TestEnv::new().await;
    // TTL of zero: every challenge is expired at the boundary.
    let guardian = env.guardian(0).await;
    env.ids.create_new_wallet("requester").await.unwrap();

    let nonce = guardian.get_challenge("requester").await;
    let signature = env.ids.sign_message("requester", &nonce).await.unwrap();

    let released = guardian
        .get_private_key("requester", &nonce, &signature)
        .await;
    assert!(released.is_none(), "elapsed == TTL must reject");
}

#[tokio::test]
async fn production_approval_signature_verifies_against_guardian_key() {
    let env = TestEnv::new().await;
    let guardian = env.guardian(300).await;

    let (address, _) = env.ids.create_new_wallet("prod_agent").await.unwrap();
    register_in_registry(&env, "prod_agent", &address, true).await;
    let workspace = env.dir.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();

    let (ok, report) = guardian
        .validate_new_agent("prod_agent", &address, workspace.to_str().unwrap())
        .await;
    assert!(ok);

    let signature = guardian
        .approve_agent_for_production("prod_agent", &report)
        .await
        .unwrap();

    // 65-byte r||s||v hex signature from the guardian's own identity.
    assert_eq!(signature.len(), 130);
    assert!(env
        .ids
        .get_public_address("guardian_agent_main")
        .await
        .is_some());
}
