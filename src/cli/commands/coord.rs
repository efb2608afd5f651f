//! Coordinator commands: query, analyze, improve, backlog management.

use serde_json::json;
use uuid::Uuid;

use super::AppContext;
use crate::cli::output::{backlog_table, CommandResult};
use crate::domain::models::{BacklogStatus, InteractionType, MAX_BACKLOG_PRIORITY};

/// User id recorded for CLI-originated interactions.
const CLI_USER: &str = "cli_user";

pub async fn handle_query(ctx: &AppContext, query: &str) -> CommandResult {
    let result = ctx
        .coordinator
        .handle_user_input(query, CLI_USER, InteractionType::UserQuery, json!({}))
        .await;
    interaction_result("Query processed", result)
}

pub async fn handle_analyze(ctx: &AppContext, context: Option<&str>) -> CommandResult {
    let content = context.unwrap_or("Full system analysis");
    let result = ctx
        .coordinator
        .handle_user_input(content, CLI_USER, InteractionType::SystemAnalysis, json!({}))
        .await;
    interaction_result("Analysis complete", result)
}

pub async fn handle_improve(
    ctx: &AppContext,
    component_id: &str,
    context: Option<&str>,
    priority: u8,
) -> CommandResult {
    if priority > MAX_BACKLOG_PRIORITY {
        return CommandResult::failure(
            format!("Priority {priority} is out of range (0-{MAX_BACKLOG_PRIORITY})"),
            "INVALID_PRIORITY",
        );
    }
    let content = context.map_or_else(
        || format!("Improve component '{component_id}'"),
        String::from,
    );
    let result = ctx
        .coordinator
        .handle_user_input(
            &content,
            CLI_USER,
            InteractionType::ComponentImprovement,
            json!({"priority": priority, "target_component": component_id}),
        )
        .await;
    interaction_result("Improvement queued", result)
}

pub async fn handle_backlog(ctx: &AppContext, json_only: bool) -> CommandResult {
    let items = ctx.coordinator.backlog().await;
    if !json_only && !items.is_empty() {
        println!("{}", console::style("Improvement backlog").bold());
        println!("{}", backlog_table(&items));
    }
    CommandResult::success(
        format!("{} backlog item(s)", items.len()),
        Some(json!({"backlog": items})),
    )
}

pub async fn handle_backlog_process(ctx: &AppContext) -> CommandResult {
    match ctx.coordinator.process_next_backlog_item().await {
        Some(item) => {
            let data = json!({"item": item});
            if item.status == BacklogStatus::Done {
                CommandResult::success("Backlog item processed", Some(data))
            } else {
                CommandResult::failure(
                    format!("Backlog item ended {}", item.status.as_str()),
                    "BACKLOG_ITEM_REJECTED",
                )
            }
        }
        None => CommandResult::success("No pending backlog items", None),
    }
}

pub async fn handle_approve(ctx: &AppContext, item_id: Uuid) -> CommandResult {
    match ctx.coordinator.approve_backlog_item(item_id).await {
        Ok(item) => CommandResult::success(
            format!("Item {item_id} is {}", item.status.as_str()),
            Some(json!({"item": item})),
        ),
        Err(e) => CommandResult::failure(e.to_string(), e.kind()),
    }
}

pub async fn handle_reject(ctx: &AppContext, item_id: Uuid) -> CommandResult {
    match ctx.coordinator.reject_backlog_item(item_id).await {
        Ok(item) => CommandResult::success(
            format!("Item {item_id} is {}", item.status.as_str()),
            Some(json!({"item": item})),
        ),
        Err(e) => CommandResult::failure(e.to_string(), e.kind()),
    }
}

fn interaction_result(success_message: &str, result: serde_json::Value) -> CommandResult {
    if result["status"] == json!("completed") {
        CommandResult::success(success_message, Some(result))
    } else {
        let message = result["error"]
            .as_str()
            .unwrap_or("interaction failed")
            .to_string();
        CommandResult::failure(message, "INTERACTION_FAILED")
    }
}
