//! Chain reconciliation
//!
//! Decides what to do with blocks received from a peer: ignore them, append
//! a single block that extends our tip, ask for the peer's whole chain, or
//! replace our chain with a heavier one.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::consensus::{validate_block_structure, Block, ValidationError};
use crate::storage::{Chain, Ledger, LedgerError};

/// What happened to a received block list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The received tip is not ahead of ours
    NotAhead { local: u64, received: u64 },
    /// The received tip extended ours and was appended
    Appended(Block),
    /// A lone block we cannot link; the peer's whole chain is needed
    RequestChain,
    /// Our chain was replaced; carries the new tip
    Replaced(Block),
    /// The data was invalid or not heavier than ours
    Rejected(LedgerError),
}

impl ReconcileOutcome {
    /// True when the local chain changed and the new tip should be gossiped
    pub fn changed_tip(&self) -> Option<&Block> {
        match self {
            ReconcileOutcome::Appended(block) | ReconcileOutcome::Replaced(block) => Some(block),
            _ => None,
        }
    }
}

/// Gossip-driven fork handling over the ledger
#[derive(Clone)]
pub struct Reconciler {
    ledger: Arc<Ledger>,
}

impl Reconciler {
    /// Create a reconciler for `ledger`
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Answer for a tip query
    pub fn latest_block(&self) -> Block {
        self.ledger.latest_block()
    }

    /// Answer for a full-chain query
    pub fn chain(&self) -> Chain {
        self.ledger.snapshot()
    }

    /// Handle a chain response (one block or a whole chain) from a peer
    pub fn handle_chain_response(&self, received: Vec<Block>) -> ReconcileOutcome {
        let Some(received_tip) = received.last() else {
            warn!("Received block chain size of 0");
            return ReconcileOutcome::Rejected(ValidationError::EmptyChain.into());
        };

        if let Err(err) = validate_block_structure(received_tip) {
            warn!("Received block structure not valid: {}", err);
            return ReconcileOutcome::Rejected(err.into());
        }

        let local_tip = self.ledger.latest_block();
        if received_tip.index <= local_tip.index {
            debug!(
                local = local_tip.index,
                received = received_tip.index,
                "Received chain is not ahead of ours; ignoring"
            );
            return ReconcileOutcome::NotAhead {
                local: local_tip.index,
                received: received_tip.index,
            };
        }

        info!(
            local = local_tip.index,
            received = received_tip.index,
            "Blockchain possibly behind"
        );

        let received_tip = received_tip.clone();
        if received_tip.previous_hash == local_tip.hash {
            match self.ledger.append(received_tip.clone()) {
                Ok(()) => return ReconcileOutcome::Appended(received_tip),
                Err(err) => warn!("Received block does not extend our tip: {}", err),
            }
        }

        if received.len() == 1 {
            info!("Received a single block we cannot append; querying the chain from peers");
            return ReconcileOutcome::RequestChain;
        }

        info!("Received chain is ahead of ours; attempting replacement");
        match self.ledger.replace(received) {
            Ok(()) => ReconcileOutcome::Replaced(received_tip),
            Err(err) => {
                warn!("Received chain rejected: {}", err);
                ReconcileOutcome::Rejected(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::genesis_block;
    use crate::mining::{Miner, MiningResult};

    fn mine_on(previous: &Block, data: &str, difficulty: u32) -> Block {
        match Miner::new().mine_block(previous, data.to_string(), difficulty) {
            MiningResult::Success(block) => block,
            MiningResult::Interrupted => panic!("miner was not stopped"),
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(Arc::new(Ledger::new()))
    }

    #[test]
    fn test_empty_response_rejected() {
        let r = reconciler();
        assert_eq!(
            r.handle_chain_response(vec![]),
            ReconcileOutcome::Rejected(LedgerError::Invalid(ValidationError::EmptyChain))
        );
    }

    #[test]
    fn test_not_ahead_is_ignored() {
        let r = reconciler();
        assert_eq!(
            r.handle_chain_response(vec![genesis_block()]),
            ReconcileOutcome::NotAhead { local: 0, received: 0 }
        );
    }

    #[test]
    fn test_linked_block_is_appended() {
        let r = reconciler();
        let block = mine_on(&genesis_block(), "a", 0);
        let outcome = r.handle_chain_response(vec![block.clone()]);
        assert_eq!(outcome, ReconcileOutcome::Appended(block.clone()));
        assert_eq!(outcome.changed_tip(), Some(&block));
        assert_eq!(r.latest_block(), block);
    }

    #[test]
    fn test_linked_but_invalid_block_requests_chain() {
        let r = reconciler();
        let mut block = mine_on(&genesis_block(), "a", 0);
        block.nonce += 1;
        assert_eq!(r.handle_chain_response(vec![block]), ReconcileOutcome::RequestChain);
        assert_eq!(r.chain().len(), 1);
    }

    #[test]
    fn test_linked_but_invalid_chain_falls_back_to_replace() {
        let r = reconciler();
        let genesis = genesis_block();
        let b1 = mine_on(&genesis, "a", 0);
        let mut b2 = mine_on(&b1, "b", 0);
        b2.previous_hash = genesis.hash.clone();

        assert!(matches!(
            r.handle_chain_response(vec![genesis, b1, b2]),
            ReconcileOutcome::Rejected(LedgerError::Invalid(_))
        ));
        assert_eq!(r.chain().len(), 1);
    }

    #[test]
    fn test_replaced_reports_candidate_tip() {
        let r = reconciler();
        let genesis = genesis_block();
        let b1 = mine_on(&genesis, "a", 0);
        let b2 = mine_on(&b1, "b", 0);
        let b3 = mine_on(&b2, "c", 0);

        let outcome = r.handle_chain_response(vec![genesis, b1, b2, b3.clone()]);
        assert_eq!(outcome.changed_tip(), Some(&b3));
    }

    #[test]
    fn test_unlinked_single_block_requests_chain() {
        let r = reconciler();
        let b1 = mine_on(&genesis_block(), "a", 0);
        let b2 = mine_on(&b1, "b", 0);
        assert_eq!(r.handle_chain_response(vec![b2]), ReconcileOutcome::RequestChain);
        assert_eq!(r.chain().len(), 1);
    }

    #[test]
    fn test_longer_chain_replaces() {
        let r = reconciler();
        let genesis = genesis_block();
        let b1 = mine_on(&genesis, "a", 0);
        let b2 = mine_on(&b1, "b", 0);

        let outcome = r.handle_chain_response(vec![genesis, b1, b2.clone()]);
        assert_eq!(outcome, ReconcileOutcome::Replaced(b2));
        assert_eq!(r.chain().len(), 3);
    }

    #[test]
    fn test_malformed_tip_rejected() {
        let r = reconciler();
        let mut block = mine_on(&genesis_block(), "a", 0);
        block.hash = "not-a-hash".into();
        assert!(matches!(
            r.handle_chain_response(vec![block]),
            ReconcileOutcome::Rejected(LedgerError::Invalid(ValidationError::Structure(_)))
        ));
    }
}
