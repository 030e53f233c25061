//! Consensus module - Block structure, genesis, validation, and difficulty

mod block;
mod difficulty;
mod genesis;
mod validation;

pub use block::*;
pub use difficulty::*;
pub use genesis::*;
pub use validation::*;
