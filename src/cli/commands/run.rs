//! Bounded AGInt cognitive session.

use std::sync::Arc;

use serde_json::json;

use super::AppContext;
use crate::cli::output::CommandResult;
use crate::services::Agint;

pub async fn handle_run(ctx: &AppContext, directive: &str, cycles: u32) -> CommandResult {
    if let Err(e) = ctx.ids.create_new_wallet("agint_cli").await {
        return CommandResult::error(e.to_string(), e.kind());
    }

    let bdi = ctx.bdi("bdi.agint_cli");
    let agint = Arc::new(Agint::new(
        "agint_cli",
        bdi,
        ctx.config.agint.clone(),
        ctx.generator.clone(),
        ctx.searcher.clone(),
        Some(ctx.coordinator.clone()),
        ctx.memory.clone(),
    ));

    // A bounded, deterministic session: run the requested number of
    // Perceive-Orient-Decide-Act cycles directly rather than spawning the
    // open-ended loop.
    agint.set_directive(directive).await;
    for cycle in 0..cycles {
        if let Err(e) = agint.run_single_cycle().await {
            return CommandResult::failure(
                format!("Cycle {cycle} failed: {e}"),
                e.kind(),
            );
        }
    }

    CommandResult::success(
        format!("Cognitive session over '{directive}' completed {cycles} cycle(s)"),
        Some(json!({
            "llm_operational": agint.llm_operational().await,
        })),
    )
}
