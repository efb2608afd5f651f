//! Identity domain model.
//!
//! Each entity (agent, tool, service) owns exactly one secp256k1 keypair.
//! The private key lives only in the sealed key-store file; everything else
//! in the process sees the public address.

use serde::{Deserialize, Serialize};

/// Prefix for key-store variable names.
pub const KEY_VAR_PREFIX: &str = "MINDX_WALLET_PK_";

/// Belief key prefix mapping entity id -> public address.
pub const BELIEF_ENTITY_TO_ADDRESS: &str = "identity.map.entity_to_address.";

/// Belief key prefix mapping public address -> entity id.
pub const BELIEF_ADDRESS_TO_ENTITY: &str = "identity.map.address_to_entity.";

/// A managed identity as exposed by `id list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedIdentity {
    pub entity_id: String,
    pub public_address: String,
}

/// Deterministic key-store variable name for an entity.
///
/// Non-word characters are replaced with `_` and the result is uppercased,
/// e.g. `guardian_agent_main` -> `MINDX_WALLET_PK_GUARDIAN_AGENT_MAIN`.
pub fn key_var_name(entity_id: &str) -> String {
    let safe: String = entity_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{}{}", KEY_VAR_PREFIX, safe.to_uppercase())
}

/// Belief key holding the address for an entity id.
pub fn entity_to_address_key(entity_id: &str) -> String {
    format!("{BELIEF_ENTITY_TO_ADDRESS}{entity_id}")
}

/// Belief key holding the entity id for an address.
pub fn address_to_entity_key(address: &str) -> String {
    format!("{BELIEF_ADDRESS_TO_ENTITY}{address}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_var_name_uppercases_and_sanitizes() {
        assert_eq!(
            key_var_name("guardian_agent_main"),
            "MINDX_WALLET_PK_GUARDIAN_AGENT_MAIN"
        );
        assert_eq!(key_var_name("agent-7.alpha"), "MINDX_WALLET_PK_AGENT_7_ALPHA");
        assert_eq!(key_var_name("a b"), "MINDX_WALLET_PK_A_B");
    }

    #[test]
    fn test_belief_keys() {
        assert_eq!(
            entity_to_address_key("x"),
            "identity.map.entity_to_address.x"
        );
        assert_eq!(
            address_to_entity_key("0xabc"),
            "identity.map.address_to_entity.0xabc"
        );
    }
}
