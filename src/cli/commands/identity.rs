//! Identity manager commands.

use serde_json::json;

use super::AppContext;
use crate::cli::output::CommandResult;

pub async fn handle_list(ctx: &AppContext) -> CommandResult {
    let identities = ctx.ids.list_managed_identities().await;
    CommandResult::success(
        format!("{} managed identit(ies)", identities.len()),
        Some(json!({"identities": identities})),
    )
}

pub async fn handle_create(ctx: &AppContext, entity_id: &str) -> CommandResult {
    match ctx.ids.create_new_wallet(entity_id).await {
        Ok((address, key_var)) => CommandResult::success(
            format!("Identity ready for '{entity_id}'"),
            Some(json!({"entity_id": entity_id, "public_address": address, "key_var": key_var})),
        ),
        Err(e) => CommandResult::failure(e.to_string(), e.kind()),
    }
}

pub async fn handle_deprecate(ctx: &AppContext, entity_id: &str) -> CommandResult {
    match ctx.ids.deprecate_identity(entity_id).await {
        Ok(true) => CommandResult::success(format!("Identity '{entity_id}' deprecated"), None),
        Ok(false) => CommandResult::failure(
            format!("No key sealed for entity: {entity_id}"),
            "KEY_NOT_FOUND",
        ),
        Err(e) => CommandResult::failure(e.to_string(), e.kind()),
    }
}
