//! mindx - Autonomous multi-agent orchestration framework
//!
//! A three-tier decision hierarchy that continuously evolves a codebase:
//! - Mastermind: strategic planner running audit/improve/validate campaigns
//! - AGInt: cognitive controller (Perceive -> Orient -> Decide -> Act)
//! - BDI executor: turns one goal into a validated plan of tool actions
//!
//! Around the hierarchy: a shared BeliefSystem with provenance, a
//! Coordinator with a priority backlog, a Guardian performing cryptographic
//! admission control, an IDManager holding sealed secp256k1 identities, a
//! MemoryAgent appending process traces, and a pluggable ToolRegistry.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::{MindxError, MindxResult};
