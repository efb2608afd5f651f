//! CLI interface: command definitions and handlers.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mindx")]
#[command(about = "mindx - Autonomous Multi-Agent Orchestration", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output the JSON envelope only (no tables)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file path (overrides the .mindx/ hierarchy)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a Mastermind evolution campaign
    Evolve {
        /// Top-level directive for the campaign
        directive: String,

        /// Cycle cap for the strategic BDI run
        #[arg(short, long, default_value = "25")]
        max_cycles: u32,
    },

    /// Run a Mastermind agent-deployment campaign
    Deploy {
        /// What the deployed agents should accomplish
        directive: String,

        /// Cycle cap for the strategic BDI run
        #[arg(short, long, default_value = "25")]
        max_cycles: u32,
    },

    /// Generate and store a new persona
    Introspect {
        /// Directive the persona must serve
        directive: String,

        /// Role the persona is stored under
        #[arg(short, long, default_value = "MASTERMIND")]
        role: String,
    },

    /// Current strategic state and recent campaigns
    Status {
        /// How many recent campaigns to include
        #[arg(short, long, default_value = "5")]
        last: usize,
    },

    /// Run the AGInt cognitive loop over a directive for a bounded number
    /// of cycles
    Run {
        /// Directive for the cognitive loop
        directive: String,

        /// Number of Perceive-Orient-Decide-Act cycles
        #[arg(short = 'n', long, default_value = "3")]
        cycles: u32,
    },

    /// Coordinator commands
    #[command(subcommand)]
    Coord(CoordCommands),

    /// Agent lifecycle on the Coordinator registry
    #[command(subcommand)]
    Agent(AgentCommands),

    /// Identity manager operations
    #[command(subcommand)]
    Id(IdCommands),

    /// Audit operations
    #[command(subcommand)]
    Audit(AuditCommands),
}

#[derive(Subcommand)]
pub enum CoordCommands {
    /// Dispatch a user query interaction
    Query {
        /// The query text
        query: String,
    },

    /// Create and process a system analysis interaction
    Analyze {
        /// Optional analysis focus
        context: Option<String>,
    },

    /// Enqueue a component improvement backlog item
    Improve {
        /// Component the improvement targets
        component_id: String,

        /// What to improve
        context: Option<String>,

        /// Backlog priority (0-10)
        #[arg(short, long, default_value = "5")]
        priority: u8,
    },

    /// Show the ordered improvement backlog
    Backlog,

    /// Process the highest-priority pending backlog item
    BacklogProcess,

    /// Reinstate a backlog item for processing
    Approve {
        /// Backlog item id
        item_id: Uuid,
    },

    /// Reject a backlog item
    Reject {
        /// Backlog item id
        item_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Create an identity and register an agent
    Create {
        agent_id: String,

        /// Agent type label
        #[arg(short = 't', long, default_value = "worker")]
        agent_type: String,

        /// Human-readable description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Deregister (and shut down) an agent
    Delete { agent_id: String },

    /// Enqueue an evolution directive for an agent
    Evolve { agent_id: String, directive: String },

    /// Sign the registration payload with the agent's key
    Sign { agent_id: String },

    /// Run Guardian admission validation for an agent
    Validate {
        agent_id: String,

        /// Workspace directory the agent will operate in
        #[arg(short, long, default_value = ".")]
        workspace: String,

        /// Issue a signed production approval when validation passes
        #[arg(long)]
        approve: bool,
    },

    /// List the agent registry
    List,
}

#[derive(Subcommand)]
pub enum IdCommands {
    /// List managed identities
    List,

    /// Create (idempotently) an identity for an entity
    Create { entity_id: String },

    /// Remove an identity and unseal its key
    Deprecate { entity_id: String },
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Probe the text generator and report its health
    Llm {
        /// Also attempt a JSON-mode probe
        #[arg(long)]
        test_all: bool,

        /// Persist probe outcome into the beliefs store
        #[arg(long)]
        update_config: bool,
    },

    /// Register a recurring audit campaign and run one scheduler tick
    Schedule {
        campaign_id: String,

        /// What is being audited
        #[arg(short, long, default_value = "system health")]
        scope: String,

        /// Components under audit (comma-separated)
        #[arg(short = 'c', long, value_delimiter = ',')]
        components: Vec<String>,

        /// Hours between runs
        #[arg(short, long, default_value = "24")]
        interval_hours: i64,

        /// Backlog priority for injected items
        #[arg(short, long, default_value = "5")]
        priority: u8,
    },
}
