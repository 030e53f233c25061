//! P2P protocol messages
//!
//! Wire format is a JSON record `{ "type": 0 | 1 | 2, "data": [Block] | null }`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::consensus::Block;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Could not parse message: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Chain response carries no block list")]
    MissingPayload,
}

/// P2P message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MessageType {
    /// Request the peer's latest block
    QueryLast = 0,
    /// Request the peer's whole chain
    QueryAll = 1,
    /// One block (latest) or the whole chain
    ResponseChain = 2,
}

impl TryFrom<u8> for MessageType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::QueryLast),
            1 => Ok(MessageType::QueryAll),
            2 => Ok(MessageType::ResponseChain),
            other => Err(format!("unknown message type {}", other)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> u8 {
        kind as u8
    }
}

/// A gossip message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub data: Option<Vec<Block>>,
}

impl Message {
    /// Ask for the peer's tip
    pub fn query_last() -> Self {
        Self {
            kind: MessageType::QueryLast,
            data: None,
        }
    }

    /// Ask for the peer's whole chain
    pub fn query_all() -> Self {
        Self {
            kind: MessageType::QueryAll,
            data: None,
        }
    }

    /// Respond with a list of blocks
    pub fn response_chain(blocks: Vec<Block>) -> Self {
        Self {
            kind: MessageType::ResponseChain,
            data: Some(blocks),
        }
    }

    /// Respond with only the latest block
    pub fn response_latest(block: Block) -> Self {
        Self::response_chain(vec![block])
    }

    /// Serialize to the JSON wire form
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            error!(command = self.command(), "Failed to serialize message: {}", err);
            String::new()
        })
    }

    /// Parse and check a JSON wire message
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        let message: Message = serde_json::from_str(raw)?;
        if message.kind == MessageType::ResponseChain && message.data.is_none() {
            return Err(ProtocolError::MissingPayload);
        }
        Ok(message)
    }

    /// Get the command name for this message
    pub fn command(&self) -> &'static str {
        match self.kind {
            MessageType::QueryLast => "query_last",
            MessageType::QueryAll => "query_all",
            MessageType::ResponseChain => "response_chain",
        }
    }
}
