//! Peer error types

use thiserror::Error;

/// Errors raised on the local side of peer messaging
///
/// Remote failures and timeouts arrive as a [`PeerResponse`](super::PeerResponse)
/// status instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("Peer node channel closed")]
    ChannelClosed,

    #[error("Peer {0} is unreachable")]
    Unreachable(String),

    #[error("Failed to encode message: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for PeerError {
    fn from(e: serde_json::Error) -> Self {
        PeerError::Encode(e.to_string())
    }
}
