//! HTTP server
//!
//! Axum router exposing the chain, the miner and the peer list.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::node::Node;
use crate::rpc::methods::{add_peer, list_blocks, list_peers, mine_block};

/// Build the router for `node`
pub fn router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/blocks", get(list_blocks))
        .route("/mineBlock", post(mine_block))
        .route("/peers", get(list_peers))
        .route("/addPeer", post(add_peer))
        .layer(cors)
        .with_state(node)
}

/// Serve HTTP on `listener` until the server fails
pub async fn start_rpc_server(node: Arc<Node>, listener: TcpListener) -> std::io::Result<()> {
    info!("Listening http on {}", listener.local_addr()?);
    axum::serve(listener, router(node)).await
}
