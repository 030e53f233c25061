//! SHA-256 hashing and proof-of-work arithmetic
//!
//! Block hashes travel as lowercase hex strings; this module owns the
//! conversion between that form and the raw 32-byte digest.

use sha2::{Digest, Sha256};
use std::fmt;

/// 32-byte hash output
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Create hash from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(hex, &mut arr)?;
        Ok(Hash(arr))
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Number of leading zero bits in the big-endian binary expansion
    pub fn leading_zero_bits(&self) -> u32 {
        let mut bits = 0;
        for byte in self.0 {
            if byte == 0 {
                bits += 8;
            } else {
                bits += byte.leading_zeros();
                break;
            }
        }
        bits
    }

    /// Check the proof-of-work condition for this digest
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        self.leading_zero_bits() >= difficulty
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// Check whether a hex-encoded digest has at least `difficulty` leading zero bits
///
/// Strings that are not 64 hex characters never satisfy any difficulty.
pub fn hash_matches_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    Hash::from_hex(hash_hex)
        .map(|hash| hash.meets_difficulty(difficulty))
        .unwrap_or(false)
}
