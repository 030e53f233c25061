//! Block structure for the chain
//!
//! Defines the immutable block and the canonical encoding its hash is
//! computed over.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::crypto::{hash_bytes, Hash};

/// A single block as stored in the ledger and sent over the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain (genesis is 0)
    pub index: u64,
    /// Hex-encoded SHA-256 of the other six fields
    pub hash: String,
    /// Hex hash of the parent block, empty only for genesis
    pub previous_hash: String,
    /// Seconds since Unix epoch
    pub timestamp: u64,
    /// Opaque payload
    pub data: String,
    /// Required leading zero bits of `hash`
    pub difficulty: u32,
    /// Proof-of-work search variable
    pub nonce: u64,
}

impl Block {
    /// Build a block, computing its hash from the given fields
    pub fn new(
        index: u64,
        previous_hash: String,
        timestamp: u64,
        data: String,
        difficulty: u32,
        nonce: u64,
    ) -> Self {
        let hash = calculate_hash(index, &previous_hash, timestamp, &data, difficulty, nonce);
        Self {
            index,
            hash: hash.to_hex(),
            previous_hash,
            timestamp,
            data,
            difficulty,
            nonce,
        }
    }

    /// Recompute the hash from the block's fields (ignores the stored `hash`)
    pub fn calculate_hash(&self) -> Hash {
        calculate_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.data,
            self.difficulty,
            self.nonce,
        )
    }

    /// Work contributed by this block: 2^difficulty, saturating
    pub fn work(&self) -> u128 {
        1u128.checked_shl(self.difficulty).unwrap_or(u128::MAX)
    }
}

/// Serialize the hashed fields unambiguously
///
/// Integers are fixed-width little endian; strings carry a u64 length prefix
/// so adjacent fields can never bleed into each other.
pub fn encode_fields(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    data: &str,
    difficulty: u32,
    nonce: u64,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + 8 + previous_hash.len() + 8 + 8 + data.len() + 4 + 8);
    bytes.extend_from_slice(&index.to_le_bytes());
    bytes.extend_from_slice(&(previous_hash.len() as u64).to_le_bytes());
    bytes.extend_from_slice(previous_hash.as_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(&(data.len() as u64).to_le_bytes());
    bytes.extend_from_slice(data.as_bytes());
    bytes.extend_from_slice(&difficulty.to_le_bytes());
    bytes.extend_from_slice(&nonce.to_le_bytes());
    bytes
}

/// Hash the six block fields
pub fn calculate_hash(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    data: &str,
    difficulty: u32,
    nonce: u64,
) -> Hash {
    hash_bytes(&encode_fields(
        index,
        previous_hash,
        timestamp,
        data,
        difficulty,
        nonce,
    ))
}

/// Current wall clock time in whole seconds
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
