//! Property-based and adversarial tests for the ledger
//!
//! These tests verify invariants hold under random inputs.

use proptest::prelude::*;
use powchain::consensus::{
    calculate_hash, chain_weight, genesis_block, is_valid_chain, validate_new_block_at, Block,
};
use powchain::crypto::hash_matches_difficulty;
use powchain::mining::{Miner, MiningResult};
use powchain::storage::Ledger;

fn mine(previous: &Block, data: String, difficulty: u32, timestamp: u64) -> Block {
    match Miner::new().mine_block_at(previous, data, difficulty, timestamp) {
        MiningResult::Success(block) => block,
        MiningResult::Interrupted => panic!("miner was not stopped"),
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

proptest! {
    /// Block hash is deterministic
    #[test]
    fn prop_block_hash_deterministic(
        index in any::<u64>(),
        previous_hash in "[0-9a-f]{64}",
        timestamp in any::<u64>(),
        data in ".{0,64}",
        difficulty in 0u32..256,
        nonce in any::<u64>(),
    ) {
        let a = calculate_hash(index, &previous_hash, timestamp, &data, difficulty, nonce);
        let b = calculate_hash(index, &previous_hash, timestamp, &data, difficulty, nonce);
        prop_assert_eq!(a, b);
    }

    /// Changing the nonce changes the hash
    #[test]
    fn prop_nonce_changes_hash(
        data in ".{0,32}",
        nonce in 0u64..u64::MAX,
    ) {
        let a = calculate_hash(1, "ab", 100, &data, 0, nonce);
        let b = calculate_hash(1, "ab", 100, &data, 0, nonce + 1);
        prop_assert_ne!(a, b);
    }

    /// Moving bytes between the two string fields never collides
    #[test]
    fn prop_field_boundaries_unambiguous(
        left in "[a-z]{1,16}",
        right in "[a-z]{1,16}",
    ) {
        let joined = format!("{left}{right}");
        let a = calculate_hash(1, &left, 100, &right, 0, 0);
        let b = calculate_hash(1, &joined, 100, "", 0, 0);
        prop_assert_ne!(a, b);
    }

    /// A freshly mined block meets its difficulty and validates on its parent
    #[test]
    fn prop_mined_block_validates(
        data in ".{0,32}",
        difficulty in 0u32..8,
        delta in 0u64..1_000,
    ) {
        let genesis = genesis_block();
        let timestamp = genesis.timestamp + delta;
        let block = mine(&genesis, data, difficulty, timestamp);

        prop_assert!(hash_matches_difficulty(&block.hash, difficulty));
        prop_assert!(validate_new_block_at(&block, &genesis, timestamp).is_ok());
    }

    /// JSON encoding preserves every field
    #[test]
    fn prop_block_serde_preserves_fields(
        index in any::<u64>(),
        hash in "[0-9a-f]{64}",
        previous_hash in "[0-9a-f]{64}",
        timestamp in any::<u64>(),
        data in ".{0,64}",
        difficulty in any::<u32>(),
        nonce in any::<u64>(),
    ) {
        let block = Block { index, hash, previous_hash, timestamp, data, difficulty, nonce };
        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(decoded, block);
    }

    /// Weight never decreases as blocks are appended
    #[test]
    fn prop_weight_monotonic_under_append(
        difficulties in prop::collection::vec(0u32..6, 1..8),
    ) {
        let ledger = Ledger::new();
        let mut previous_weight = ledger.weight();

        for (i, difficulty) in difficulties.into_iter().enumerate() {
            let tip = ledger.latest_block();
            let block = mine(&tip, format!("block-{i}"), difficulty, tip.timestamp + 10);
            ledger.append(block).unwrap();

            let weight = ledger.weight();
            prop_assert!(weight > previous_weight);
            previous_weight = weight;
        }

        prop_assert_eq!(previous_weight, chain_weight(&ledger.snapshot()));
        prop_assert!(is_valid_chain(&ledger.snapshot()));
    }

    /// Huge difficulties saturate instead of overflowing
    #[test]
    fn prop_weight_saturates(difficulty in 128u32..=u32::MAX) {
        let block = Block {
            index: 1,
            hash: String::new(),
            previous_hash: String::new(),
            timestamp: 0,
            data: String::new(),
            difficulty,
            nonce: 0,
        };
        prop_assert_eq!(chain_weight(&[block.clone(), block]), u128::MAX);
    }
}

// ============================================================================
// ADVERSARIAL TESTS
// ============================================================================

#[test]
fn tampered_payload_is_rejected() {
    let genesis = genesis_block();
    let mut block = mine(&genesis, "honest".into(), 4, genesis.timestamp + 10);
    block.data = "forged".into();
    assert!(validate_new_block_at(&block, &genesis, genesis.timestamp + 10).is_err());
}

#[test]
fn understated_work_is_rejected() {
    let genesis = genesis_block();
    let block = mine(&genesis, "lazy".into(), 0, genesis.timestamp + 10);
    let mut inflated = block.clone();
    inflated.difficulty = 64;
    inflated.hash = inflated.calculate_hash().to_hex();
    assert!(validate_new_block_at(&inflated, &genesis, genesis.timestamp + 10).is_err());
}

#[test]
fn chain_not_rooted_at_genesis_is_invalid() {
    let mut fake_genesis = genesis_block();
    fake_genesis.data = "alternate history".into();
    let block = mine(&fake_genesis, "next".into(), 0, fake_genesis.timestamp + 10);
    assert!(!is_valid_chain(&[fake_genesis, block]));
}
