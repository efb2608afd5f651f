//! Service layer: the decision hierarchy and its collaborators.

pub mod agint;
pub mod audit_coordinator;
pub mod bdi;
pub mod belief_system;
pub mod coordinator;
pub mod guardian;
pub mod id_manager;
pub mod mastermind;
pub mod memory_agent;
pub mod persona_store;
pub mod system_analyzer;
pub mod tool_registry;

pub use agint::{decide_rule_based, Agint, AgintStatus, DecisionType};
pub use audit_coordinator::AuditCoordinator;
pub use bdi::BdiAgent;
pub use belief_system::BeliefSystem;
pub use coordinator::Coordinator;
pub use guardian::{Guardian, ValidationReport};
pub use id_manager::IdManager;
pub use mastermind::Mastermind;
pub use memory_agent::{MemoryAgent, MemoryStatistics, TraceRecord};
pub use persona_store::PersonaStore;
pub use system_analyzer::{ImprovementSuggestion, SystemAnalyzer};
pub use tool_registry::ToolRegistry;
