//! P2P networking module - gossip messages, peers, and the WebSocket transport

mod gossip;
mod peer;
mod protocol;
mod transport;

pub use gossip::*;
pub use peer::*;
pub use protocol::*;
pub use transport::*;
