//! Block miner implementation
//!
//! Searches for a nonce that satisfies the difficulty target. The search is
//! unbounded but checks a shared stop signal on every attempt.

use crate::consensus::{calculate_hash, current_timestamp, Block};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Mining result
#[derive(Debug)]
pub enum MiningResult {
    /// Successfully mined a block
    Success(Block),
    /// Mining was interrupted by the stop signal
    Interrupted,
}

/// Block miner
#[derive(Clone, Default)]
pub struct Miner {
    /// Stop signal
    stop_signal: Arc<AtomicBool>,
}

impl Miner {
    /// Create a new miner
    pub fn new() -> Self {
        Self {
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a stop signal handle
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Stop mining
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Reset stop signal
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    /// Check whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Mine the successor of `previous` carrying `data`
    ///
    /// The timestamp is taken once, before the search starts.
    pub fn mine_block(&self, previous: &Block, data: String, difficulty: u32) -> MiningResult {
        self.mine_block_at(previous, data, difficulty, current_timestamp())
    }

    /// Mine with an explicit timestamp
    pub fn mine_block_at(
        &self,
        previous: &Block,
        data: String,
        difficulty: u32,
        timestamp: u64,
    ) -> MiningResult {
        let index = previous.index + 1;
        let mut nonce = 0u64;

        loop {
            // Check stop signal
            if self.is_stopped() {
                return MiningResult::Interrupted;
            }

            let hash = calculate_hash(
                index,
                &previous.hash,
                timestamp,
                &data,
                difficulty,
                nonce,
            );

            if hash.meets_difficulty(difficulty) {
                return MiningResult::Success(Block {
                    index,
                    hash: hash.to_hex(),
                    previous_hash: previous.hash.clone(),
                    timestamp,
                    data,
                    difficulty,
                    nonce,
                });
            }

            nonce = nonce.wrapping_add(1);
        }
    }
}
