//! Storage module - in-memory chain state
//!
//! Nothing is persisted; the chain is rebuilt from genesis on restart.

mod ledger;

pub use ledger::*;
