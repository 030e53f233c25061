//! Genesis block
//!
//! The genesis block is a process-wide constant. A candidate chain is only
//! valid if its first element is structurally identical to it.

use crate::consensus::Block;
use crate::constants::{GENESIS_DATA, GENESIS_HASH, GENESIS_TIMESTAMP};

/// Create the genesis block
///
/// Produces the same block on every call; nothing about it is mined.
pub fn genesis_block() -> Block {
    Block {
        index: 0,
        hash: GENESIS_HASH.to_string(),
        previous_hash: String::new(),
        timestamp: GENESIS_TIMESTAMP,
        data: GENESIS_DATA.to_string(),
        difficulty: 0,
        nonce: 0,
    }
}

/// Check a block against the genesis constant field by field
pub fn is_genesis_block(block: &Block) -> bool {
    *block == genesis_block()
}
