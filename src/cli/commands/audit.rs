//! Audit commands: generator health probe and campaign scheduling.

use std::sync::Arc;

use serde_json::json;

use super::AppContext;
use crate::cli::output::CommandResult;
use crate::domain::models::{BeliefSource, MAX_BACKLOG_PRIORITY};
use crate::domain::ports::GenerationOptions;
use crate::services::AuditCoordinator;

pub async fn handle_llm(ctx: &AppContext, test_all: bool, update_config: bool) -> CommandResult {
    let Some(generator) = ctx.generator.clone() else {
        return CommandResult::error("Text generator not configured", "CONFIG");
    };

    let plain = generator
        .generate(
            "Status check. Respond ONLY with 'OK'.",
            GenerationOptions::default(),
        )
        .await;
    let plain_ok = matches!(&plain, Ok(text) if text.contains("OK"));

    let json_ok = if test_all {
        let probe = generator
            .generate(
                "Respond ONLY with JSON: {\"status\": \"OK\"}",
                GenerationOptions::json(),
            )
            .await;
        Some(matches!(&probe, Ok(text) if serde_json::from_str::<serde_json::Value>(text).is_ok()))
    } else {
        None
    };

    let healthy = plain_ok && json_ok.unwrap_or(true);
    let data = json!({
        "model": ctx.config.llm.model,
        "plain_probe_ok": plain_ok,
        "json_probe_ok": json_ok,
    });

    if update_config {
        ctx.beliefs
            .add_belief(
                "llm.audit.latest",
                data.clone(),
                1.0,
                BeliefSource::SelfAnalysis,
            )
            .await;
    }

    if healthy {
        CommandResult::success("Text generator healthy", Some(data))
    } else {
        CommandResult::failure("Text generator probe failed", "LLM_UNHEALTHY")
    }
}

pub async fn handle_schedule(
    ctx: &AppContext,
    campaign_id: &str,
    scope: &str,
    components: Vec<String>,
    interval_hours: i64,
    priority: u8,
) -> CommandResult {
    if priority > MAX_BACKLOG_PRIORITY {
        return CommandResult::failure(
            format!("Priority {priority} is out of range (0-{MAX_BACKLOG_PRIORITY})"),
            "INVALID_PRIORITY",
        );
    }
    let audits = Arc::new(AuditCoordinator::new(
        ctx.coordinator.clone(),
        ctx.memory.clone(),
    ));
    audits
        .add_audit_campaign(campaign_id, scope, components, interval_hours, priority)
        .await;
    let injected = audits.tick().await;
    let campaigns = audits.list_campaigns().await;
    CommandResult::success(
        format!("Campaign '{campaign_id}' scheduled; {injected} backlog item(s) injected"),
        Some(json!({"campaigns": campaigns})),
    )
}
