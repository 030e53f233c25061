//! Difficulty adjustment algorithm
//!
//! Retargets every DIFFICULTY_ADJUSTMENT_INTERVAL blocks, stepping by one
//! bit when the last interval was mined more than twice as fast or slow as
//! BLOCK_GENERATION_INTERVAL seconds per block.

use crate::consensus::Block;
use crate::constants::{BLOCK_GENERATION_INTERVAL, DIFFICULTY_ADJUSTMENT_INTERVAL};

/// Expected duration of one adjustment period, in seconds
pub const EXPECTED_PERIOD_SECS: u64 = BLOCK_GENERATION_INTERVAL * DIFFICULTY_ADJUSTMENT_INTERVAL;

/// Calculate the difficulty for a retarget point
///
/// This is a pure function with no side effects. `period_difficulty` is the
/// difficulty of the block that opened the period.
pub fn calculate_next_difficulty(
    period_difficulty: u32,
    first_block_time: u64,
    last_block_time: u64,
) -> u32 {
    let elapsed = last_block_time as i128 - first_block_time as i128;
    let expected = EXPECTED_PERIOD_SECS as i128;

    if elapsed < expected / 2 {
        period_difficulty.saturating_add(1)
    } else if elapsed > expected * 2 {
        // u32 cannot go below zero; this is the caller-side guard
        period_difficulty.saturating_sub(1)
    } else {
        period_difficulty
    }
}

/// Check if difficulty should be adjusted at this height
pub fn should_adjust_difficulty(height: u64) -> bool {
    height > 0 && height % DIFFICULTY_ADJUSTMENT_INTERVAL == 0
}

/// Difficulty required for the block that will follow the tip of `chain`
pub fn next_difficulty(chain: &[Block]) -> u32 {
    let Some(tip) = chain.last() else {
        return 0;
    };

    if !should_adjust_difficulty(tip.index) {
        return tip.difficulty;
    }

    let tip_position = chain.len() - 1;
    let offset = DIFFICULTY_ADJUSTMENT_INTERVAL as usize;
    match tip_position.checked_sub(offset).and_then(|i| chain.get(i)) {
        Some(period_start) => calculate_next_difficulty(
            period_start.difficulty,
            period_start.timestamp,
            tip.timestamp,
        ),
        None => tip.difficulty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_chain(len: u64, spacing: u64, difficulty: u32) -> Vec<Block> {
        (0..len)
            .map(|i| Block {
                index: i,
                hash: String::new(),
                previous_hash: String::new(),
                timestamp: 1_000 + i * spacing,
                data: String::new(),
                difficulty,
                nonce: 0,
            })
            .collect()
    }

    #[test]
    fn test_should_adjust_difficulty() {
        assert!(!should_adjust_difficulty(0));
        assert!(!should_adjust_difficulty(1));
        assert!(should_adjust_difficulty(DIFFICULTY_ADJUSTMENT_INTERVAL));
        assert!(should_adjust_difficulty(DIFFICULTY_ADJUSTMENT_INTERVAL * 2));
    }

    #[test]
    fn test_calculate_next_difficulty_thresholds() {
        assert_eq!(calculate_next_difficulty(5, 0, 40), 6);
        assert_eq!(calculate_next_difficulty(5, 0, 49), 6);
        assert_eq!(calculate_next_difficulty(5, 0, 50), 5);
        assert_eq!(calculate_next_difficulty(5, 0, 100), 5);
        assert_eq!(calculate_next_difficulty(5, 0, 200), 5);
        assert_eq!(calculate_next_difficulty(5, 0, 201), 4);
        assert_eq!(calculate_next_difficulty(0, 0, 1_000), 0);
    }

    #[test]
    fn test_negative_elapsed_counts_as_fast() {
        assert_eq!(calculate_next_difficulty(2, 500, 400), 3);
    }

    #[test]
    fn test_inherits_between_retargets() {
        let chain = synthetic_chain(6, 1, 4);
        assert_eq!(next_difficulty(&chain), 4);
    }

    #[test]
    fn test_retarget_uses_block_one_interval_back() {
        // Tip at index 10, period start at index 0, 4 seconds per block
        let mut chain = synthetic_chain(11, 4, 3);
        chain[0].difficulty = 2;
        assert_eq!(next_difficulty(&chain), 3);
    }

    #[test]
    fn test_empty_chain() {
        assert_eq!(next_difficulty(&[]), 0);
    }
}
