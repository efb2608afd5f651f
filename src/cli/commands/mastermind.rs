//! Mastermind campaign commands: evolve, deploy, introspect, status.

use serde_json::json;

use super::AppContext;
use crate::cli::output::CommandResult;
use crate::domain::models::CampaignStatus;

pub async fn handle_evolve(ctx: &AppContext, directive: &str, max_cycles: u32) -> CommandResult {
    let mastermind = match ctx.mastermind().await {
        Ok(m) => m,
        Err(e) => return CommandResult::error(e.to_string(), "CONFIG"),
    };
    let outcome = mastermind.manage_mindx_evolution(directive, max_cycles).await;
    let data = json!({
        "overall_campaign_status": outcome.overall_campaign_status,
        "run_id": outcome.run_id,
    });
    match outcome.overall_campaign_status {
        CampaignStatus::Success => CommandResult::success(outcome.message, Some(data)),
        _ => CommandResult::failure(outcome.message, "CAMPAIGN_INCOMPLETE"),
    }
}

pub async fn handle_deploy(ctx: &AppContext, directive: &str, max_cycles: u32) -> CommandResult {
    let mastermind = match ctx.mastermind().await {
        Ok(m) => m,
        Err(e) => return CommandResult::error(e.to_string(), "CONFIG"),
    };
    let outcome = mastermind.manage_agent_deployment(directive, max_cycles).await;
    let data = json!({
        "overall_campaign_status": outcome.overall_campaign_status,
        "run_id": outcome.run_id,
    });
    match outcome.overall_campaign_status {
        CampaignStatus::Success => CommandResult::success(outcome.message, Some(data)),
        _ => CommandResult::failure(outcome.message, "CAMPAIGN_INCOMPLETE"),
    }
}

pub async fn handle_introspect(ctx: &AppContext, directive: &str, role: &str) -> CommandResult {
    let Some(generator) = ctx.generator.clone() else {
        return CommandResult::error("Text generator not configured", "CONFIG");
    };
    match ctx
        .personas
        .generate_persona(&generator, role, directive)
        .await
    {
        Ok(persona) => CommandResult::success(
            format!("Stored persona for role '{role}'"),
            Some(json!({"role": role, "persona": persona})),
        ),
        Err(e) => CommandResult::failure(e.to_string(), e.kind()),
    }
}

pub async fn handle_status(ctx: &AppContext, last: usize) -> CommandResult {
    let mastermind = match ctx.mastermind().await {
        Ok(m) => m,
        Err(e) => return CommandResult::error(e.to_string(), "CONFIG"),
    };
    let status = mastermind.status(last).await;
    CommandResult::success("Mastermind status", Some(status))
}
