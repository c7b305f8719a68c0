//! Actor error types

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the remote game service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActorError {
    #[error("{op} requires map {expected}, actor is on {actual}")]
    WrongLocation {
        op: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Slot {slot} is occupied")]
    SlotOccupied { slot: usize },

    #[error("Slot {slot} is empty")]
    EmptySlot { slot: usize },

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("No free inventory slot")]
    InventoryFull,

    #[error("{op} rejected: {reason}")]
    Rejected { op: &'static str, reason: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Actor disconnected")]
    Disconnected,
}

impl ActorError {
    /// Whether retrying the same call later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ActorError::Timeout(_) => true,
            ActorError::Disconnected => true,
            ActorError::WrongLocation { .. } => true,
            ActorError::SlotOccupied { .. } => false,
            ActorError::EmptySlot { .. } => false,
            ActorError::InsufficientFunds { .. } => false,
            ActorError::InventoryFull => false,
            ActorError::Rejected { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ActorError::WrongLocation {
            op: "deposit",
            expected: "bank".to_string(),
            actual: "main".to_string(),
        };
        assert_eq!(err.to_string(), "deposit requires map bank, actor is on main");
        assert_eq!(ActorError::EmptySlot { slot: 3 }.to_string(), "Slot 3 is empty");
    }

    #[test]
    fn test_retryable() {
        assert!(ActorError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(!ActorError::InventoryFull.is_retryable());
    }
}
