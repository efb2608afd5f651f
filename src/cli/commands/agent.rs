//! Agent lifecycle commands on the Coordinator registry.

use serde_json::json;

use super::AppContext;
use crate::cli::output::{agents_table, CommandResult};
use crate::domain::models::registration::AgentRegistration;
use crate::domain::models::InteractionType;

pub async fn handle_create(
    ctx: &AppContext,
    agent_id: &str,
    agent_type: &str,
    description: &str,
) -> CommandResult {
    match ctx
        .coordinator
        .register_agent(agent_id, agent_type, description, None)
        .await
    {
        Ok(registration) => CommandResult::success(
            format!("Agent '{agent_id}' registered"),
            Some(json!({"registration": registration})),
        ),
        Err(e) => CommandResult::failure(e.to_string(), e.kind()),
    }
}

pub async fn handle_delete(ctx: &AppContext, agent_id: &str) -> CommandResult {
    match ctx.coordinator.deregister_and_shutdown_agent(agent_id).await {
        Ok(true) => CommandResult::success(format!("Agent '{agent_id}' deregistered"), None),
        Ok(false) => {
            CommandResult::failure(format!("Agent not found: {agent_id}"), "AGENT_NOT_FOUND")
        }
        Err(e) => CommandResult::failure(e.to_string(), e.kind()),
    }
}

pub async fn handle_evolve(ctx: &AppContext, agent_id: &str, directive: &str) -> CommandResult {
    if ctx.coordinator.get_agent(agent_id).await.is_none() {
        return CommandResult::failure(format!("Agent not found: {agent_id}"), "AGENT_NOT_FOUND");
    }
    let result = ctx
        .coordinator
        .handle_user_input(
            &format!("Evolve agent '{agent_id}' with directive: {directive}"),
            "cli_user",
            InteractionType::ComponentImprovement,
            json!({"target_component": agent_id, "analysis_context": directive}),
        )
        .await;
    if result["status"] == json!("completed") {
        CommandResult::success("Evolution directive queued", Some(result))
    } else {
        CommandResult::failure("Failed to queue evolution directive", "INTERACTION_FAILED")
    }
}

pub async fn handle_sign(ctx: &AppContext, agent_id: &str) -> CommandResult {
    let payload = AgentRegistration::signature_payload(agent_id);
    match ctx.ids.sign_message(agent_id, &payload).await {
        Ok(signature) => CommandResult::success(
            format!("Signed registration payload for '{agent_id}'"),
            Some(json!({"payload": payload, "signature": signature})),
        ),
        Err(e) => CommandResult::failure(e.to_string(), e.kind()),
    }
}

pub async fn handle_validate(
    ctx: &AppContext,
    agent_id: &str,
    workspace: &str,
    approve: bool,
) -> CommandResult {
    let Some(address) = ctx.ids.get_public_address(agent_id).await else {
        return CommandResult::failure(
            format!("No identity for agent: {agent_id}"),
            "KEY_NOT_FOUND",
        );
    };

    let (passed, report) = ctx
        .guardian
        .validate_new_agent(agent_id, &address, workspace)
        .await;
    if !passed {
        return CommandResult::failure(
            report
                .failure_reason
                .clone()
                .unwrap_or_else(|| "Validation failed".to_string()),
            "SECURITY_VIOLATION",
        );
    }

    let mut data = json!({"report": report});
    if approve {
        match ctx
            .guardian
            .approve_agent_for_production(agent_id, &report)
            .await
        {
            Ok(signature) => {
                data["approval_signature"] = json!(signature);
            }
            Err(e) => return CommandResult::failure(e.to_string(), e.kind()),
        }
    }
    CommandResult::success(format!("Agent '{agent_id}' validated"), Some(data))
}

pub async fn handle_list(ctx: &AppContext, json_only: bool) -> CommandResult {
    let agents = ctx.coordinator.list_agents().await;
    if !json_only && !agents.is_empty() {
        println!("{}", console::style("Agent registry").bold());
        println!("{}", agents_table(&agents));
    }
    CommandResult::success(
        format!("{} registered agent(s)", agents.len()),
        Some(json!({"agents": agents})),
    )
}
