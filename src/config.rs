//! Configuration management
//!
//! Every setting can come from a flag or from the environment.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Node configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "powchain-node", version, about = "Proof-of-work ledger node")]
pub struct NodeConfig {
    /// Port for the HTTP request surface
    #[arg(long, env = "NODE_PORT", default_value_t = 3001)]
    pub http_port: u16,

    /// Port for the WebSocket gossip listener
    #[arg(long, env = "P2P_PORT", default_value_t = 6001)]
    pub p2p_port: u16,

    /// Address both servers bind to
    #[arg(long = "bind", env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_addr: IpAddr,

    /// Peers to dial at startup, e.g. ws://127.0.0.1:6002
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,
}

impl NodeConfig {
    /// Socket address for the HTTP server
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }

    /// Socket address for the P2P listener
    pub fn p2p_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.p2p_port)
    }
}
