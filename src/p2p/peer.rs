//! Peer management
//!
//! Tracks live connections. Each peer is represented by the sending half of
//! its socket writer queue, so sends never wait on the network.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Registry-assigned peer identifier
pub type PeerId = u64;

/// A connected peer
#[derive(Debug, Clone)]
pub struct PeerHandle {
    /// Registry id
    pub id: PeerId,
    /// Remote address, `host:port`
    pub addr: String,
    outbound: mpsc::UnboundedSender<String>,
}

impl PeerHandle {
    /// Create a handle around a writer queue
    pub fn new(id: PeerId, addr: String, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self { id, addr, outbound }
    }

    /// Queue a text frame; false if the writer has gone away
    pub fn send(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }
}

/// Concurrency-safe set of connected peers
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<PeerId, PeerHandle>>,
    next_id: AtomicU64,
}

impl PeerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return its id
    pub fn add(&self, addr: String, outbound: mpsc::UnboundedSender<String>) -> PeerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.peers
            .write()
            .insert(id, PeerHandle::new(id, addr, outbound));
        id
    }

    /// Drop a connection
    pub fn remove(&self, id: PeerId) -> Option<PeerHandle> {
        self.peers.write().remove(&id)
    }

    /// Look up a single peer
    pub fn get(&self, id: PeerId) -> Option<PeerHandle> {
        self.peers.read().get(&id).cloned()
    }

    /// Copy of the current peer set, safe to iterate while peers come and go
    pub fn snapshot(&self) -> Vec<PeerHandle> {
        let mut peers: Vec<PeerHandle> = self.peers.read().values().cloned().collect();
        peers.sort_by_key(|p| p.id);
        peers
    }

    /// Addresses of all connected peers
    pub fn addresses(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|p| p.addr).collect()
    }

    /// Get number of connected peers
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// True when no peer is connected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
