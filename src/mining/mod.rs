//! Mining module - nonce search and the mining worker

mod miner;
mod worker;

pub use miner::*;
pub use worker::*;
