//! mindx CLI entry point

use anyhow::Context;
use clap::Parser;

use mindx::cli::commands::{agent, audit, coord, identity, mastermind, run, AppContext};
use mindx::cli::output::CommandResult;
use mindx::cli::{AgentCommands, AuditCommands, Cli, Commands, CoordCommands, IdCommands};
use mindx::infrastructure::{logging, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = execute(cli).await;
    let code = result.exit_code();
    result.print();
    std::process::exit(code);
}

async fn execute(cli: Cli) -> CommandResult {
    // Configuration or environment problems are exit code 2 territory.
    let config = match cli
        .config
        .as_deref()
        .map_or_else(ConfigLoader::load, ConfigLoader::load_from_file)
    {
        Ok(config) => config,
        Err(e) => return CommandResult::error(format!("{e:#}"), "CONFIG"),
    };

    let _log_guard = match logging::init(&config.logging, None) {
        Ok(guard) => guard,
        Err(e) => return CommandResult::error(format!("{e:#}"), "CONFIG"),
    };

    let ctx = match AppContext::build(config)
        .await
        .context("Failed to build service graph")
    {
        Ok(ctx) => ctx,
        Err(e) => return CommandResult::error(format!("{e:#}"), "CONFIG"),
    };

    match cli.command {
        Commands::Evolve {
            directive,
            max_cycles,
        } => mastermind::handle_evolve(&ctx, &directive, max_cycles).await,
        Commands::Deploy {
            directive,
            max_cycles,
        } => mastermind::handle_deploy(&ctx, &directive, max_cycles).await,
        Commands::Introspect { directive, role } => {
            mastermind::handle_introspect(&ctx, &directive, &role).await
        }
        Commands::Status { last } => mastermind::handle_status(&ctx, last).await,
        Commands::Run { directive, cycles } => run::handle_run(&ctx, &directive, cycles).await,

        Commands::Coord(command) => match command {
            CoordCommands::Query { query } => coord::handle_query(&ctx, &query).await,
            CoordCommands::Analyze { context } => {
                coord::handle_analyze(&ctx, context.as_deref()).await
            }
            CoordCommands::Improve {
                component_id,
                context,
                priority,
            } => coord::handle_improve(&ctx, &component_id, context.as_deref(), priority).await,
            CoordCommands::Backlog => coord::handle_backlog(&ctx, cli.json).await,
            CoordCommands::BacklogProcess => coord::handle_backlog_process(&ctx).await,
            CoordCommands::Approve { item_id } => coord::handle_approve(&ctx, item_id).await,
            CoordCommands::Reject { item_id } => coord::handle_reject(&ctx, item_id).await,
        },

        Commands::Agent(command) => match command {
            AgentCommands::Create {
                agent_id,
                agent_type,
                description,
            } => agent::handle_create(&ctx, &agent_id, &agent_type, &description).await,
            AgentCommands::Delete { agent_id } => agent::handle_delete(&ctx, &agent_id).await,
            AgentCommands::Evolve {
                agent_id,
                directive,
            } => agent::handle_evolve(&ctx, &agent_id, &directive).await,
            AgentCommands::Sign { agent_id } => agent::handle_sign(&ctx, &agent_id).await,
            AgentCommands::Validate {
                agent_id,
                workspace,
                approve,
            } => agent::handle_validate(&ctx, &agent_id, &workspace, approve).await,
            AgentCommands::List => agent::handle_list(&ctx, cli.json).await,
        },

        Commands::Id(command) => match command {
            IdCommands::List => identity::handle_list(&ctx).await,
            IdCommands::Create { entity_id } => identity::handle_create(&ctx, &entity_id).await,
            IdCommands::Deprecate { entity_id } => {
                identity::handle_deprecate(&ctx, &entity_id).await
            }
        },

        Commands::Audit(command) => match command {
            AuditCommands::Llm {
                test_all,
                update_config,
            } => audit::handle_llm(&ctx, test_all, update_config).await,
            AuditCommands::Schedule {
                campaign_id,
                scope,
                components,
                interval_hours,
                priority,
            } => {
                audit::handle_schedule(
                    &ctx,
                    &campaign_id,
                    &scope,
                    components,
                    interval_hours,
                    priority,
                )
                .await
            }
        },
    }
}
