//! Chain state management
//!
//! The ledger owns the authoritative chain as an immutable snapshot behind a
//! lock. Writers build a new snapshot and swap it in whole, so readers see
//! either the old chain or the new one, never a partial splice. Every swap
//! bumps a version number that subscribers can watch.

use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::consensus::{
    chain_weight, genesis_block, next_difficulty, validate_chain, validate_new_block, Block,
    ValidationError,
};

/// Shared, immutable view of a whole chain
pub type Chain = Arc<Vec<Block>>;

/// Ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Candidate chain weight {candidate} does not exceed current weight {current}")]
    NotHeavier { candidate: u128, current: u128 },
}

struct Versioned {
    version: u64,
    chain: Chain,
}

/// The authoritative block store
pub struct Ledger {
    current: RwLock<Versioned>,
    version_tx: watch::Sender<u64>,
}

impl Ledger {
    /// Create a ledger holding only the genesis block
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            current: RwLock::new(Versioned {
                version: 0,
                chain: Arc::new(vec![genesis_block()]),
            }),
            version_tx,
        }
    }

    /// Atomic snapshot of the whole chain
    pub fn snapshot(&self) -> Chain {
        Arc::clone(&self.current.read().chain)
    }

    /// Current tip
    pub fn latest_block(&self) -> Block {
        let guard = self.current.read();
        // The chain always holds at least genesis
        guard.chain.last().cloned().unwrap_or_else(genesis_block)
    }

    /// Number of blocks including genesis
    pub fn len(&self) -> usize {
        self.current.read().chain.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cumulative work of the current chain
    pub fn weight(&self) -> u128 {
        chain_weight(&self.current.read().chain)
    }

    /// Difficulty required for the next block on the current tip
    pub fn next_difficulty(&self) -> u32 {
        next_difficulty(&self.current.read().chain)
    }

    /// Version of the current snapshot; bumped on every append or replace
    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Watch for snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    fn publish(&self, guard: &mut Versioned, chain: Vec<Block>) {
        guard.version += 1;
        guard.chain = Arc::new(chain);
        self.version_tx.send_replace(guard.version);
    }

    /// Append a block on top of the current tip
    ///
    /// Validation and the swap happen under one write lock, so the tip cannot
    /// move between the check and the append.
    pub fn append(&self, block: Block) -> Result<(), LedgerError> {
        let mut guard = self.current.write();
        let tip = guard.chain.last().cloned().unwrap_or_else(genesis_block);

        validate_new_block(&block, &tip)?;

        let mut next = Vec::with_capacity(guard.chain.len() + 1);
        next.extend_from_slice(&guard.chain);
        debug!(index = block.index, hash = %block.hash, "Appending block");
        next.push(block);
        self.publish(&mut guard, next);
        Ok(())
    }

    /// Replace the whole chain with a heavier, fully valid candidate
    pub fn replace(&self, candidate: Vec<Block>) -> Result<(), LedgerError> {
        validate_chain(&candidate)?;
        let candidate_weight = chain_weight(&candidate);

        let mut guard = self.current.write();
        let current_weight = chain_weight(&guard.chain);
        if candidate_weight <= current_weight {
            return Err(LedgerError::NotHeavier {
                candidate: candidate_weight,
                current: current_weight,
            });
        }

        info!(
            old_len = guard.chain.len(),
            new_len = candidate.len(),
            candidate_weight,
            current_weight,
            "Replacing current chain with heavier chain"
        );
        self.publish(&mut guard, candidate);
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
