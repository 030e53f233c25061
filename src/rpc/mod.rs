//! HTTP API module
//!
//! Lets operators read the chain, request mining and manage peers.

mod methods;
mod server;

pub use methods::*;
pub use server::*;
