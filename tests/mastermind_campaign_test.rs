//! Mastermind campaign outcomes and the persisted history layout.

mod common;

use std::sync::Arc;

use common::{ScriptedGenerator, TestEnv};
use mindx::domain::models::config::BdiConfig;
use mindx::domain::models::{CampaignRecord, CampaignStatus};
use mindx::services::bdi::{BdiAgent, COMPLETED_GOAL_ACHIEVED};
use mindx::services::mastermind::{
    Mastermind, CAMPAIGN_HISTORY_FILE, MASTERMIND_AGENT_ID, NO_ACTIONS_MESSAGE,
};
use mindx::services::ToolRegistry;
use serde_json::json;

async fn mastermind_with(env: &TestEnv, generator: Option<Arc<ScriptedGenerator>>) -> Mastermind {
    let generator = generator.map(|g| g as _);
    let coordinator = env.coordinator(generator.clone()).await;
    let tools = Arc::new(
        ToolRegistry::open(env.dir.path().join("config/official_tools_registry.json")).await,
    );
    let bdi = BdiAgent::new(
        format!("mastermind_strategy_{MASTERMIND_AGENT_ID}"),
        env.beliefs.clone(),
        env.memory.clone(),
        generator.clone(),
        env.dir.path().join("workspace"),
        BdiConfig::default(),
    );
    Mastermind::init(
        env.beliefs.clone(),
        env.memory.clone(),
        env.ids.clone(),
        coordinator,
        tools,
        generator,
        bdi,
        env.memory.get_agent_data_directory(MASTERMIND_AGENT_ID).await,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn evolution_with_empty_suggestions_is_success() {
    let env = TestEnv::new().await;
    let generator = ScriptedGenerator::ok(vec![
        json!({"improvement_suggestions": []}).to_string()
    ]);
    let mastermind = mastermind_with(&env, Some(generator)).await;

    let outcome = mastermind.manage_mindx_evolution("anything", 10).await;
    assert_eq!(outcome.overall_campaign_status, CampaignStatus::Success);
    assert_eq!(outcome.message, NO_ACTIONS_MESSAGE);

    // The campaign record was appended with that status.
    let history = mastermind.campaign_history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].overall_status, CampaignStatus::Success);
}

#[tokio::test]
async fn campaign_success_iff_bdi_message_prefix() {
    let env = TestEnv::new().await;
    // Campaign 1: BDI achieves the goal.
    let generator = ScriptedGenerator::ok(vec![
        json!({"improvement_suggestions": [
            {"description": "do a thing", "priority": 7, "target_component": "core"}
        ]})
        .to_string(),
        json!({"plan": [{"type": "NO_OP", "params": {}}]}).to_string(),
    ]);
    let mastermind = mastermind_with(&env, Some(generator)).await;
    let outcome = mastermind.manage_mindx_evolution("improve", 10).await;
    assert_eq!(outcome.overall_campaign_status, CampaignStatus::Success);
    assert!(outcome.message.starts_with(COMPLETED_GOAL_ACHIEVED));

    // Campaign 2: BDI cannot plan; the outcome is FAILURE_OR_INCOMPLETE.
    let outcome = mastermind.manage_mindx_evolution("improve again", 10).await;
    assert_eq!(
        outcome.overall_campaign_status,
        CampaignStatus::FailureOrIncomplete
    );
}

#[tokio::test]
async fn history_file_lives_in_mastermind_data_directory() {
    let env = TestEnv::new().await;
    let generator = ScriptedGenerator::ok(vec![
        json!({"improvement_suggestions": []}).to_string()
    ]);
    let mastermind = mastermind_with(&env, Some(generator)).await;
    mastermind.manage_mindx_evolution("anything", 5).await;

    let history_path = env
        .dir
        .path()
        .join("memory")
        .join(MASTERMIND_AGENT_ID)
        .join(CAMPAIGN_HISTORY_FILE);
    assert!(history_path.exists(), "missing {}", history_path.display());

    let records: Vec<CampaignRecord> =
        serde_json::from_slice(&std::fs::read(&history_path).unwrap()).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].run_id.starts_with("mastermind_run_"));
}

#[tokio::test]
async fn deployment_campaign_drives_agent_lifecycle() {
    let env = TestEnv::new().await;
    let generator = ScriptedGenerator::ok(vec![json!({"plan": [
        {"type": "CREATE_AGENT", "params": {"agent_type": "scout", "agent_id": "scout_1"}},
        {"type": "DELETE_AGENT", "params": {"agent_id": "scout_1"}},
    ]})
    .to_string()]);
    let mastermind = mastermind_with(&env, Some(generator)).await;

    let outcome = mastermind
        .manage_agent_deployment("scout then clean up", 10)
        .await;
    assert_eq!(outcome.overall_campaign_status, CampaignStatus::Success);

    // The scout was removed from the persistent registry mirror; its
    // identity remains custodied.
    let doc: mindx::domain::models::AgentsRegistryDoc =
        serde_json::from_slice(&std::fs::read(env.registry_path()).unwrap()).unwrap();
    assert!(!doc.registered_agents.contains_key("scout_1"));
    assert!(env.ids.get_public_address("scout_1").await.is_some());
}
