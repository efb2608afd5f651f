//! Central custody of cryptographic identities.
//!
//! One secp256k1 keypair per entity. Private keys are sealed in the
//! owner-only key-store file and never leave this module except through the
//! Guardian's single sanctioned release path. Addresses are Ethereum-style:
//! `keccak256(uncompressed_pubkey)[12..]`, and message signatures are made
//! over the `"\x19Ethereum Signed Message:\n<len>"`-prefixed digest so they
//! are domain-separated from any application payload.

use std::path::Path;
use std::sync::Arc;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde_json::json;
use sha3::{Digest, Keccak256};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::models::identity::{
    address_to_entity_key, entity_to_address_key, key_var_name, BELIEF_ENTITY_TO_ADDRESS,
};
use crate::domain::models::{BeliefSource, ManagedIdentity};
use crate::domain::{MindxError, MindxResult};
use crate::infrastructure::SealedKeyStore;
use crate::services::{BeliefSystem, MemoryAgent};

/// Identity custodian. Shared via `Arc`; key-store access is serialized
/// behind an internal lock.
pub struct IdManager {
    agent_id: String,
    belief_system: Arc<BeliefSystem>,
    memory: Arc<MemoryAgent>,
    keystore: Mutex<SealedKeyStore>,
}

impl IdManager {
    /// Open the manager over the sealed store in `identity_dir`.
    pub async fn open(
        agent_id: impl Into<String>,
        identity_dir: &Path,
        belief_system: Arc<BeliefSystem>,
        memory: Arc<MemoryAgent>,
    ) -> MindxResult<Self> {
        let keystore = SealedKeyStore::open(identity_dir).await?;
        let agent_id = agent_id.into();
        info!(agent_id, key_store = %keystore.path().display(), "IdManager initialized");
        Ok(Self {
            agent_id,
            belief_system,
            memory,
            keystore: Mutex::new(keystore),
        })
    }

    /// Public address for an entity: belief map first, then derivation from
    /// the sealed key (recorded back as a `Derived` belief).
    pub async fn get_public_address(&self, entity_id: &str) -> Option<String> {
        if let Some(belief) = self
            .belief_system
            .get_belief(&entity_to_address_key(entity_id))
            .await
        {
            return belief.value.as_str().map(String::from);
        }

        let private_key_hex = match self.read_sealed_key(entity_id).await {
            Ok(key) => key?,
            Err(e) => {
                warn!(entity_id, error = %e, "Key store read failed during address lookup");
                return None;
            }
        };

        match address_from_private_hex(&private_key_hex) {
            Ok(address) => {
                self.record_identity_beliefs(entity_id, &address).await;
                self.trace(
                    "id_manager_address_derived",
                    json!({"entity_id": entity_id, "address": address}),
                )
                .await;
                Some(address)
            }
            Err(e) => {
                self.trace(
                    "id_manager_address_derivation_failed",
                    json!({"entity_id": entity_id, "error": e.to_string()}),
                )
                .await;
                None
            }
        }
    }

    /// Reverse lookup: entity id owning an address.
    pub async fn get_entity_id(&self, public_address: &str) -> Option<String> {
        self.belief_system
            .get_belief(&address_to_entity_key(public_address))
            .await
            .and_then(|b| b.value.as_str().map(String::from))
    }

    /// Create a wallet for an entity, only if one does not already exist.
    ///
    /// Returns `(public_address, key_var_name)`. Idempotent: an existing
    /// identity is returned untouched. Storage failures are fatal.
    pub async fn create_new_wallet(&self, entity_id: &str) -> MindxResult<(String, String)> {
        let var_name = key_var_name(entity_id);
        if let Some(existing) = self.get_public_address(entity_id).await {
            self.trace(
                "id_manager_wallet_exists",
                json!({"entity_id": entity_id, "address": existing}),
            )
            .await;
            return Ok((existing, var_name));
        }

        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let private_key_hex = hex::encode(signing_key.to_bytes());
        let address = address_from_verifying_key(signing_key.verifying_key());

        {
            let keystore = self.keystore.lock().await;
            keystore.set(&var_name, &private_key_hex).await?;
        }
        self.record_identity_beliefs(entity_id, &address).await;
        self.trace(
            "id_manager_wallet_created",
            json!({"entity_id": entity_id, "address": address, "env_var": var_name}),
        )
        .await;
        info!(entity_id, address, "Created new wallet");
        Ok((address, var_name))
    }

    /// Sign a message with the entity's sealed key.
    ///
    /// The signature is 65 bytes `r || s || v`, hex-encoded.
    pub async fn sign_message(&self, entity_id: &str, message: &str) -> MindxResult<String> {
        let private_key_hex = self
            .read_sealed_key(entity_id)
            .await?
            .ok_or_else(|| MindxError::KeyNotFound(entity_id.to_string()))?;

        let signature = sign_prefixed(&private_key_hex, message).map_err(|e| {
            MindxError::SigningFailed {
                entity_id: entity_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        self.trace(
            "id_manager_message_signed",
            json!({"entity_id": entity_id, "message_length": message.len()}),
        )
        .await;
        Ok(signature)
    }

    /// Recover the signer from a signature and compare case-insensitively
    /// against `public_address`.
    pub fn verify_signature(&self, public_address: &str, message: &str, signature: &str) -> bool {
        match recover_prefixed(message, signature) {
            Ok(recovered) => recovered.eq_ignore_ascii_case(public_address),
            Err(e) => {
                warn!(public_address, error = %e, "Signature verification failed");
                false
            }
        }
    }

    /// All identities recorded in the belief map.
    pub async fn list_managed_identities(&self) -> Vec<ManagedIdentity> {
        self.belief_system
            .query_beliefs(BELIEF_ENTITY_TO_ADDRESS, 0.0, None)
            .await
            .into_iter()
            .filter_map(|(key, belief)| {
                let entity_id = key.strip_prefix(BELIEF_ENTITY_TO_ADDRESS)?.to_string();
                let public_address = belief.value.as_str()?.to_string();
                Some(ManagedIdentity {
                    entity_id,
                    public_address,
                })
            })
            .collect()
    }

    /// Remove an identity: unseal the key and drop the belief mappings.
    pub async fn deprecate_identity(&self, entity_id: &str) -> MindxResult<bool> {
        let address = self.get_public_address(entity_id).await;
        let removed = {
            let keystore = self.keystore.lock().await;
            keystore.remove(&key_var_name(entity_id)).await?
        };
        self.belief_system
            .remove_belief(&entity_to_address_key(entity_id))
            .await;
        if let Some(address) = address {
            self.belief_system
                .remove_belief(&address_to_entity_key(&address))
                .await;
        }
        self.trace(
            "id_manager_identity_deprecated",
            json!({"entity_id": entity_id, "removed": removed}),
        )
        .await;
        Ok(removed)
    }

    /// Sealed key read for the Guardian's release path. Every other caller
    /// must treat private keys as unreachable.
    pub async fn private_key_for_guardian(&self, entity_id: &str) -> Option<String> {
        match self.read_sealed_key(entity_id).await {
            Ok(key) => key,
            Err(e) => {
                warn!(entity_id, error = %e, "Key store read failed during guardian release");
                None
            }
        }
    }

    async fn read_sealed_key(&self, entity_id: &str) -> MindxResult<Option<String>> {
        let keystore = self.keystore.lock().await;
        keystore.get(&key_var_name(entity_id)).await
    }

    async fn record_identity_beliefs(&self, entity_id: &str, address: &str) {
        self.belief_system
            .add_belief(
                &entity_to_address_key(entity_id),
                json!(address),
                1.0,
                BeliefSource::Derived,
            )
            .await;
        self.belief_system
            .add_belief(
                &address_to_entity_key(address),
                json!(entity_id),
                1.0,
                BeliefSource::Derived,
            )
            .await;
    }

    async fn trace(&self, process_name: &str, data: serde_json::Value) {
        self.memory
            .log_process(
                &self.agent_id,
                process_name,
                data,
                json!({"agent_id": self.agent_id}),
            )
            .await;
    }
}

/// Keccak-256 of the Ethereum signed-message prefix plus the message.
fn prefixed_digest(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()));
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Address of a verifying key: last 20 bytes of the Keccak-256 of the
/// uncompressed point (without the 0x04 tag), lowercase `0x`-hex.
fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

fn address_from_private_hex(private_key_hex: &str) -> MindxResult<String> {
    let signing_key = signing_key_from_hex(private_key_hex)?;
    Ok(address_from_verifying_key(signing_key.verifying_key()))
}

fn signing_key_from_hex(private_key_hex: &str) -> MindxResult<SigningKey> {
    let bytes = hex::decode(private_key_hex.trim_start_matches("0x"))
        .map_err(|e| MindxError::Crypto(format!("private key hex: {e}")))?;
    SigningKey::from_slice(&bytes).map_err(|e| MindxError::Crypto(format!("private key: {e}")))
}

fn sign_prefixed(private_key_hex: &str, message: &str) -> MindxResult<String> {
    let signing_key = signing_key_from_hex(private_key_hex)?;
    let digest = prefixed_digest(message);
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| MindxError::Crypto(format!("sign: {e}")))?;

    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(&signature.to_bytes());
    bytes[64] = 27 + recovery_id.to_byte();
    Ok(hex::encode(bytes))
}

fn recover_prefixed(message: &str, signature_hex: &str) -> MindxResult<String> {
    let bytes = hex::decode(signature_hex.trim_start_matches("0x"))
        .map_err(|e| MindxError::Crypto(format!("signature hex: {e}")))?;
    if bytes.len() != 65 {
        return Err(MindxError::Crypto(format!(
            "signature must be 65 bytes, got {}",
            bytes.len()
        )));
    }
    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| MindxError::Crypto(format!("signature: {e}")))?;
    let v = bytes[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .ok_or_else(|| MindxError::Crypto(format!("recovery id: {v}")))?;

    let digest = prefixed_digest(message);
    let recovered = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| MindxError::Crypto(format!("recover: {e}")))?;
    Ok(address_from_verifying_key(&recovered))
}
