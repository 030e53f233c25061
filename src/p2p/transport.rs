//! WebSocket transport
//!
//! Accepts and dials WebSocket connections. Every connection gets a writer
//! task fed by an unbounded queue and a reader loop that hands text frames
//! to the gossip protocol.

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_async, connect_async, WebSocketStream};
use tracing::{debug, info, warn};

use crate::p2p::{GossipProtocol, Message, PeerId, PeerRegistry, Transport};

/// How long a closing connection may spend flushing queued frames
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Outbound half of the transport: serializes and queues messages
pub struct WsTransport {
    peers: Arc<PeerRegistry>,
}

impl WsTransport {
    /// Create a transport over the peer registry
    pub fn new(peers: Arc<PeerRegistry>) -> Self {
        Self { peers }
    }
}

impl Transport for WsTransport {
    fn send(&self, peer: PeerId, message: &Message) {
        match self.peers.get(peer) {
            Some(handle) => {
                if !handle.send(message.to_json()) {
                    debug!(peer, "Writer closed; message dropped");
                }
            }
            None => debug!(peer, "Unknown peer; message dropped"),
        }
    }

    fn broadcast(&self, message: &Message) {
        let json = message.to_json();
        for handle in self.peers.snapshot() {
            handle.send(json.clone());
        }
    }
}

/// Inbound half of the transport: connection lifecycle
pub struct P2pNetwork {
    peers: Arc<PeerRegistry>,
    gossip: Arc<GossipProtocol>,
}

impl P2pNetwork {
    /// Create the network over a registry and a protocol handler
    pub fn new(peers: Arc<PeerRegistry>, gossip: Arc<GossipProtocol>) -> Self {
        Self { peers, gossip }
    }

    /// Accept peers forever on `listener`
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), TransportError> {
        info!("Listening websocket p2p on {}", listener.local_addr()?);

        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("Accept error: {}", err);
                    continue;
                }
            };
            let network = Arc::clone(&self);
            tokio::spawn(async move {
                match accept_async(stream).await {
                    Ok(ws) => network.run_connection(ws, addr.to_string()).await,
                    Err(err) => warn!(%addr, "WebSocket handshake failed: {}", err),
                }
            });
        }
    }

    /// Dial a peer such as `ws://127.0.0.1:6001` and run the connection in the background
    pub async fn connect(self: Arc<Self>, url: &str) -> Result<(), TransportError> {
        let (ws, _) = connect_async(url).await?;
        let addr = url
            .trim_start_matches("ws://")
            .trim_start_matches("wss://")
            .trim_end_matches('/')
            .to_string();
        tokio::spawn(async move { self.run_connection(ws, addr).await });
        Ok(())
    }

    /// Dial without waiting for the result; failures are only logged
    pub fn connect_in_background(self: &Arc<Self>, url: String) {
        let network = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = network.connect(&url).await {
                warn!(%url, "Connection failed: {}", err);
            }
        });
    }

    async fn run_connection<S>(&self, ws: WebSocketStream<S>, addr: String)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sink, mut stream) = ws.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let peer = self.peers.add(addr.clone(), outbound_tx);

        let mut writer = tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(err) = sink.send(WsMessage::Text(text)).await {
                    debug!("Write failed: {}", err);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        self.gossip.on_connected(peer);

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => {
                    self.gossip.handle_raw(peer, &text);
                }
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!(peer, %addr, "Connection error: {}", err);
                    break;
                }
            }
        }

        // Removing the peer drops the last sender, so the writer ends once
        // the frames already queued are flushed
        self.peers.remove(peer);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            debug!(peer, "Writer did not drain in time");
            writer.abort();
        }
        self.gossip.on_disconnected(peer);
    }
}
