//! Node assembly
//!
//! Wires the ledger, mining worker, gossip protocol and transport together
//! and runs the P2P and HTTP servers until shutdown.

use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::NodeConfig;
use crate::consensus::Block;
use crate::mining::{MiningError, MiningService};
use crate::p2p::{GossipProtocol, P2pNetwork, PeerRegistry, TransportError, WsTransport};
use crate::storage::{Chain, Ledger};
use crate::sync::Reconciler;

/// Node errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A running ledger node
pub struct Node {
    ledger: Arc<Ledger>,
    peers: Arc<PeerRegistry>,
    gossip: Arc<GossipProtocol>,
    network: Arc<P2pNetwork>,
    miner: MiningService,
}

impl Node {
    /// Build a node holding only the genesis block
    ///
    /// Must be called from within a tokio runtime; the mining worker is
    /// spawned immediately.
    pub fn new() -> Self {
        let ledger = Arc::new(Ledger::new());
        let peers = Arc::new(PeerRegistry::new());
        let transport = Arc::new(WsTransport::new(Arc::clone(&peers)));
        let gossip = Arc::new(GossipProtocol::new(
            Reconciler::new(Arc::clone(&ledger)),
            transport,
        ));
        let network = Arc::new(P2pNetwork::new(Arc::clone(&peers), Arc::clone(&gossip)));
        let miner = MiningService::spawn(Arc::clone(&ledger));

        Self {
            ledger,
            peers,
            gossip,
            network,
            miner,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Current chain snapshot
    pub fn blocks(&self) -> Chain {
        self.ledger.snapshot()
    }

    /// Mine `data` into the next block and announce it
    pub async fn mine_block(&self, data: String) -> Result<Block, MiningError> {
        let block = self.miner.mine(data).await?;
        self.gossip.broadcast_latest();
        Ok(block)
    }

    /// Remote addresses of connected peers
    pub fn peer_addresses(&self) -> Vec<String> {
        self.peers.addresses()
    }

    /// Dial a peer in the background
    pub fn add_peer(&self, url: String) {
        info!(%url, "Adding peer");
        self.network.connect_in_background(url);
    }

    /// Serve P2P and HTTP until ctrl-c or a server failure
    pub async fn run(self: Arc<Self>, config: NodeConfig) -> Result<(), NodeError> {
        let p2p_listener = TcpListener::bind(config.p2p_addr()).await?;
        let http_listener = TcpListener::bind(config.http_addr()).await?;

        for peer in config.peers.iter().filter(|p| !p.trim().is_empty()) {
            self.add_peer(peer.trim().to_string());
        }

        let network = Arc::clone(&self.network);
        let result = tokio::select! {
            res = network.serve(p2p_listener) => res.map_err(NodeError::from),
            res = crate::rpc::start_rpc_server(Arc::clone(&self), http_listener) => {
                res.map_err(NodeError::from)
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        if let Err(err) = &result {
            error!("Node stopped: {}", err);
        }
        self.miner.shutdown();
        result
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
