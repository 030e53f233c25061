//! Gossip protocol handlers
//!
//! Turns inbound messages into ledger queries and reconciliation, and
//! pushes the results back out through an injected transport.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::p2p::{Message, MessageType, PeerId};
use crate::sync::{ReconcileOutcome, Reconciler};

/// Outbound side of the network, provided by the socket layer
///
/// Both operations are fire-and-forget: they queue the message and return.
pub trait Transport: Send + Sync {
    /// Send to a single peer
    fn send(&self, peer: PeerId, message: &Message);
    /// Send to every connected peer
    fn broadcast(&self, message: &Message);
}

/// Gossip message handling for one node
pub struct GossipProtocol {
    reconciler: Reconciler,
    transport: Arc<dyn Transport>,
}

impl GossipProtocol {
    /// Create the protocol over a reconciler and a transport
    pub fn new(reconciler: Reconciler, transport: Arc<dyn Transport>) -> Self {
        Self {
            reconciler,
            transport,
        }
    }

    /// Connection-established callback: ask the new peer for its tip
    pub fn on_connected(&self, peer: PeerId) {
        info!(peer, "Peer connected");
        self.transport.send(peer, &Message::query_last());
    }

    /// Connection-closed callback
    pub fn on_disconnected(&self, peer: PeerId) {
        info!(peer, "Peer disconnected");
    }

    /// Handle a raw text frame; malformed frames are logged and dropped
    pub fn handle_raw(&self, peer: PeerId, raw: &str) -> Option<ReconcileOutcome> {
        match Message::from_json(raw) {
            Ok(message) => self.handle_message(peer, message),
            Err(err) => {
                warn!(peer, "Dropping message: {}", err);
                None
            }
        }
    }

    /// Dispatch a parsed message
    ///
    /// Returns the reconciliation outcome for chain responses.
    pub fn handle_message(&self, peer: PeerId, message: Message) -> Option<ReconcileOutcome> {
        debug!(peer, command = message.command(), "Received message");

        match message.kind {
            MessageType::QueryLast => {
                let latest = self.reconciler.latest_block();
                self.transport.send(peer, &Message::response_latest(latest));
                None
            }
            MessageType::QueryAll => {
                let chain = self.reconciler.chain();
                self.transport
                    .send(peer, &Message::response_chain(chain.as_ref().clone()));
                None
            }
            MessageType::ResponseChain => {
                let blocks = message.data.unwrap_or_default();
                let outcome = self.reconciler.handle_chain_response(blocks);
                match &outcome {
                    ReconcileOutcome::RequestChain => self.query_all(),
                    other => {
                        if other.changed_tip().is_some() {
                            self.broadcast_latest();
                        }
                    }
                }
                Some(outcome)
            }
        }
    }

    /// Announce our tip to every peer
    pub fn broadcast_latest(&self) {
        let latest = self.reconciler.latest_block();
        self.transport.broadcast(&Message::response_latest(latest));
    }

    /// Ask every peer for its whole chain
    pub fn query_all(&self) {
        self.transport.broadcast(&Message::query_all());
    }
}
