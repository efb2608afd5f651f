//! Admission challenge model.
//!
//! The Guardian issues one nonce per requesting entity. A challenge is
//! single-use and expires after its TTL; expiry exactly at the boundary
//! rejects.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A pending challenge issued to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Entity the nonce was issued to.
    pub requesting_entity: String,
    /// 32-byte nonce, hex-encoded.
    pub nonce: String,
    /// When the nonce was issued.
    pub issued_at: DateTime<Utc>,
}

impl Challenge {
    /// Issue a fresh random challenge for an entity.
    pub fn issue(requesting_entity: impl Into<String>) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            requesting_entity: requesting_entity.into(),
            nonce: hex::encode(bytes),
            issued_at: Utc::now(),
        }
    }

    /// Whether the challenge has expired as of `now`.
    ///
    /// The upper bound is closed: elapsed time equal to the TTL rejects.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_seconds: i64) -> bool {
        now - self.issued_at >= Duration::seconds(ttl_seconds)
    }
}
