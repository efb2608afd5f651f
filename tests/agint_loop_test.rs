//! AGInt cognitive-loop behavior across full cycles: the self-repair path
//! with mandatory verification, and research fallback after failures.

mod common;

use std::sync::Arc;

use common::{ScriptedGenerator, TestEnv};
use mindx::domain::models::config::{AgintConfig, BdiConfig};
use mindx::domain::ports::GenerationError;
use mindx::services::bdi::BdiAgent;
use mindx::services::{decide_rule_based, Agint, DecisionType};
use serde_json::json;

fn enrichment(details: serde_json::Value) -> String {
    json!({"situational_awareness": "aware", "decision_details": details}).to_string()
}

async fn agint_with(
    env: &TestEnv,
    generator: Arc<ScriptedGenerator>,
    with_coordinator: bool,
) -> Arc<Agint> {
    let coordinator = if with_coordinator {
        Some(env.coordinator(Some(generator.clone() as _)).await)
    } else {
        None
    };
    let bdi = BdiAgent::new(
        "bdi.agint_integration",
        env.beliefs.clone(),
        env.memory.clone(),
        Some(generator.clone() as _),
        env.dir.path().join("workspace"),
        BdiConfig::default(),
    );
    let config = AgintConfig {
        cycle_delay_seconds: 0.01,
        llm_failure_cooldown_seconds: 0.01,
        max_bdi_cycles: 5,
    };
    let agint = Arc::new(Agint::new(
        "agint_integration",
        bdi,
        config,
        Some(generator as _),
        None,
        coordinator,
        env.memory.clone(),
    ));
    agint.set_directive("integration directive").await;
    agint
}

#[tokio::test]
async fn self_repair_path_restores_llm_health() {
    let env = TestEnv::new().await;
    let generator = ScriptedGenerator::new(vec![
        // Cycle enrichment (decision type stays SELF_REPAIR).
        Ok(enrichment(json!({}))),
        // Coordinator system-analysis generation.
        Ok(json!({"improvement_suggestions": []}).to_string()),
        // Mandatory verification generation.
        Ok("OK".to_string()),
    ]);
    let agint = agint_with(&env, generator, true).await;

    // Force the unhealthy state; the rule tree must choose SELF_REPAIR.
    agint.set_llm_operational(false).await;
    assert_eq!(decide_rule_based(false, false), DecisionType::SelfRepair);

    agint.run_single_cycle().await.unwrap();

    // Verification returned "OK": health is restored and the next decision
    // is BDI_DELEGATION.
    assert!(agint.llm_operational().await);
    assert_eq!(decide_rule_based(true, false), DecisionType::BdiDelegation);
}

#[tokio::test]
async fn self_repair_verification_failure_keeps_llm_down() {
    let env = TestEnv::new().await;
    let generator = ScriptedGenerator::new(vec![
        Ok(enrichment(json!({}))),
        Ok(json!({"improvement_suggestions": []}).to_string()),
        // Verification does not contain the health token.
        Ok("still broken".to_string()),
    ]);
    let agint = agint_with(&env, generator, true).await;

    agint.set_llm_operational(false).await;
    agint.run_single_cycle().await.unwrap();

    assert!(!agint.llm_operational().await);
}

#[tokio::test]
async fn failure_then_research_without_searcher() {
    let env = TestEnv::new().await;
    let generator = ScriptedGenerator::new(vec![
        // Cycle 1 enrichment: delegate a task to BDI.
        Ok(enrichment(json!({"task_description": "doomed task"}))),
        // BDI plan attempts all fail.
        Err(GenerationError::Empty),
        Err(GenerationError::Empty),
        Err(GenerationError::Empty),
        // Cycle 2 enrichment: the rule tree has selected RESEARCH.
        Ok(enrichment(json!({"search_query": "why did it fail"}))),
    ]);
    let agint = agint_with(&env, generator, false).await;

    // Cycle 1: delegation fails.
    agint.run_single_cycle().await.unwrap();
    // Cycle 2: perceives the failure, researches; no searcher registered.
    agint.run_single_cycle().await.unwrap();

    // The action trace records the research denial.
    let traces_dir = env.dir.path().join("memory/agint_integration/traces");
    let mut found = false;
    for entry in std::fs::read_dir(&traces_dir).unwrap() {
        let path = entry.unwrap().path();
        let content = std::fs::read_to_string(&path).unwrap();
        if content.contains("agint_action") && content.contains("WebSearchTool not available") {
            found = true;
        }
    }
    assert!(found, "expected a research-denied action trace");
}

#[tokio::test]
async fn loop_start_and_stop() {
    let env = TestEnv::new().await;
    // Invalid enrichment keeps every cycle in cooldown.
    let generator = ScriptedGenerator::ok(vec!["not json".to_string(); 64]);
    let agint = agint_with(&env, generator, false).await;

    agint.start("loop directive").await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    agint.stop().await;
    assert_eq!(
        agint.status().await,
        mindx::services::AgintStatus::Inactive
    );
}
