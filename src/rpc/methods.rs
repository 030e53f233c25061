//! HTTP handlers
//!
//! Each handler maps one route onto a node operation.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::consensus::Block;
use crate::mining::MiningError;
use crate::node::Node;

/// Body of `POST /mineBlock`
#[derive(Debug, Deserialize, Serialize)]
pub struct MineBlockRequest {
    pub data: String,
}

/// Body of `POST /addPeer`
#[derive(Debug, Deserialize, Serialize)]
pub struct AddPeerRequest {
    pub peer: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Errors surfaced over HTTP
#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    Mining(MiningError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Mining(err @ MiningError::Cancelled)
            | ApiError::Mining(err @ MiningError::WorkerUnavailable) => {
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            ApiError::Mining(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<MiningError> for ApiError {
    fn from(err: MiningError) -> Self {
        ApiError::Mining(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

/// `GET /blocks`
pub async fn list_blocks(State(node): State<Arc<Node>>) -> Json<Vec<Block>> {
    Json(node.blocks().as_ref().clone())
}

/// `POST /mineBlock`
pub async fn mine_block(
    State(node): State<Arc<Node>>,
    body: Result<Json<MineBlockRequest>, JsonRejection>,
) -> Result<Json<Block>, ApiError> {
    let Json(request) = body?;
    match node.mine_block(request.data).await {
        Ok(block) => Ok(Json(block)),
        Err(err) => {
            warn!("Mining request failed: {}", err);
            Err(err.into())
        }
    }
}

/// `GET /peers`
pub async fn list_peers(State(node): State<Arc<Node>>) -> Json<Vec<String>> {
    Json(node.peer_addresses())
}

/// `POST /addPeer`
pub async fn add_peer(
    State(node): State<Arc<Node>>,
    body: Result<Json<AddPeerRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body?;
    if request.peer.trim().is_empty() {
        return Err(ApiError::InvalidInput("peer address is empty".to_string()));
    }
    node.add_peer(request.peer);
    Ok(StatusCode::OK)
}
