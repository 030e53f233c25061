//! Block and chain validation
//!
//! Pure functions for validating blocks and chains. Checks run in a fixed
//! order and the first failure is reported.

use crate::consensus::{current_timestamp, is_genesis_block, Block};
use crate::constants::TIMESTAMP_TOLERANCE;
use crate::crypto::Hash;
use thiserror::Error;

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid block structure: {0}")]
    Structure(&'static str),
    #[error("Invalid index: expected {expected}, got {actual}")]
    InvalidIndex { expected: u64, actual: u64 },
    #[error("Invalid previous hash: expected {expected}, got {actual}")]
    InvalidPreviousHash { expected: String, actual: String },
    #[error("Invalid timestamp {timestamp} (previous {previous}, now {now})")]
    InvalidTimestamp { timestamp: u64, previous: u64, now: u64 },
    #[error("Hash mismatch: computed {computed}, stored {stored}")]
    HashMismatch { computed: String, stored: String },
    #[error("Invalid proof of work: hash has fewer than {difficulty} leading zero bits")]
    InvalidProofOfWork { difficulty: u32 },
    #[error("First block does not match genesis")]
    InvalidGenesis,
    #[error("Received chain is empty")]
    EmptyChain,
}

impl ValidationError {
    /// True for index and previous-hash mismatches
    pub fn is_linkage(&self) -> bool {
        matches!(
            self,
            ValidationError::InvalidIndex { .. } | ValidationError::InvalidPreviousHash { .. }
        )
    }
}

fn is_hex_digest(value: &str) -> bool {
    Hash::from_hex(value).is_ok()
}

/// Validate field formats
///
/// Integer and text types are enforced by deserialization; this checks that
/// both hashes are 64-character hex digests. Only index 0 may carry an
/// empty previous hash.
pub fn validate_block_structure(block: &Block) -> Result<(), ValidationError> {
    if !is_hex_digest(&block.hash) {
        return Err(ValidationError::Structure("hash is not a 256-bit hex digest"));
    }

    let genesis_parent = block.index == 0 && block.previous_hash.is_empty();
    if !genesis_parent && !is_hex_digest(&block.previous_hash) {
        return Err(ValidationError::Structure(
            "previousHash is not a 256-bit hex digest",
        ));
    }

    Ok(())
}

/// Boolean form of [`validate_block_structure`]
pub fn is_valid_block_structure(block: &Block) -> bool {
    validate_block_structure(block).is_ok()
}

/// Check the timestamp window against the parent and the local clock
fn validate_timestamp(block: &Block, previous: &Block, now: u64) -> Result<(), ValidationError> {
    let after_parent = previous.timestamp < block.timestamp.saturating_add(TIMESTAMP_TOLERANCE);
    let not_future = block.timestamp < now.saturating_add(TIMESTAMP_TOLERANCE);

    if after_parent && not_future {
        Ok(())
    } else {
        Err(ValidationError::InvalidTimestamp {
            timestamp: block.timestamp,
            previous: previous.timestamp,
            now,
        })
    }
}

/// Validate proof of work
pub fn validate_pow(block: &Block) -> Result<(), ValidationError> {
    let meets = Hash::from_hex(&block.hash)
        .map(|hash| hash.meets_difficulty(block.difficulty))
        .unwrap_or(false);

    if !meets {
        return Err(ValidationError::InvalidProofOfWork {
            difficulty: block.difficulty,
        });
    }

    Ok(())
}

/// Validate a block as the successor of `previous` at wall-clock time `now`
pub fn validate_new_block_at(
    block: &Block,
    previous: &Block,
    now: u64,
) -> Result<(), ValidationError> {
    validate_block_structure(block)?;

    let expected = previous.index + 1;
    if block.index != expected {
        return Err(ValidationError::InvalidIndex {
            expected,
            actual: block.index,
        });
    }

    if block.previous_hash != previous.hash {
        return Err(ValidationError::InvalidPreviousHash {
            expected: previous.hash.clone(),
            actual: block.previous_hash.clone(),
        });
    }

    validate_timestamp(block, previous, now)?;

    let computed = block.calculate_hash().to_hex();
    if computed != block.hash {
        return Err(ValidationError::HashMismatch {
            computed,
            stored: block.hash.clone(),
        });
    }

    validate_pow(block)
}

/// Validate a block as the successor of `previous`
pub fn validate_new_block(block: &Block, previous: &Block) -> Result<(), ValidationError> {
    validate_new_block_at(block, previous, current_timestamp())
}

/// Boolean form of [`validate_new_block`]
pub fn is_valid_new_block(block: &Block, previous: &Block) -> bool {
    validate_new_block(block, previous).is_ok()
}

/// Validate a whole chain starting from genesis
///
/// Any failing block invalidates the entire chain.
pub fn validate_chain(chain: &[Block]) -> Result<(), ValidationError> {
    let first = chain.first().ok_or(ValidationError::EmptyChain)?;
    if !is_genesis_block(first) {
        return Err(ValidationError::InvalidGenesis);
    }

    let now = current_timestamp();
    for pair in chain.windows(2) {
        validate_new_block_at(&pair[1], &pair[0], now)?;
    }

    Ok(())
}

/// Boolean form of [`validate_chain`]
pub fn is_valid_chain(chain: &[Block]) -> bool {
    validate_chain(chain).is_ok()
}

/// Cumulative work of a chain: sum of 2^difficulty, saturating
pub fn chain_weight(chain: &[Block]) -> u128 {
    chain
        .iter()
        .fold(0u128, |total, block| total.saturating_add(block.work()))
}
