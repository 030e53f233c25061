//! Minimal proof-of-work ledger node
//!
//! Keeps a locally owned, append-only chain of blocks, mines new blocks under
//! an adaptive difficulty target, validates blocks and chains received from
//! peers, and resolves forks by cumulative work.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod mining;
pub mod node;
pub mod p2p;
pub mod rpc;
pub mod storage;
pub mod sync;

/// Protocol constants - HARD-CODED, NEVER CONFIGURABLE
pub mod constants {
    /// Target seconds between blocks
    pub const BLOCK_GENERATION_INTERVAL: u64 = 10;

    /// Difficulty adjustment interval (blocks)
    pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

    /// Allowed clock drift, in seconds, for block timestamps
    pub const TIMESTAMP_TOLERANCE: u64 = 60;

    /// Genesis block hash (fixed, not derived from the genesis fields)
    pub const GENESIS_HASH: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    /// Genesis timestamp (Unix timestamp)
    pub const GENESIS_TIMESTAMP: u64 = 1737832682;

    /// Genesis payload
    pub const GENESIS_DATA: &str = "Genesis block";
}
