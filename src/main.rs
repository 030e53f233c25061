//! Proof-of-work ledger node
//!
//! Main entry point for running a node.

use clap::Parser;
use powchain::config::NodeConfig;
use powchain::node::Node;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = NodeConfig::parse();
    info!(
        http = %config.http_addr(),
        p2p = %config.p2p_addr(),
        peers = config.peers.len(),
        "Starting node"
    );

    let node = Arc::new(Node::new());
    node.run(config).await?;

    info!("Node stopped");
    Ok(())
}
