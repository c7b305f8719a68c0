//! Delivery of envelopes between peer nodes

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::{PeerCommand, PeerEnvelope, PeerError};

/// How envelopes reach another peer
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn send(&self, to: &str, envelope: PeerEnvelope) -> Result<(), PeerError>;
}

/// In-process transport connecting nodes by name
#[derive(Debug, Clone, Default)]
pub struct PeerHub {
    nodes: Arc<Mutex<HashMap<String, mpsc::Sender<PeerCommand>>>>,
}

impl PeerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, tx: mpsc::Sender<PeerCommand>) {
        let name = name.into();
        debug!(%name, "PeerHub::register: called");
        self.nodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name, tx);
    }

    pub fn unregister(&self, name: &str) {
        debug!(%name, "PeerHub::unregister: called");
        self.nodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name);
    }
}

#[async_trait]
impl PeerTransport for PeerHub {
    async fn send(&self, to: &str, envelope: PeerEnvelope) -> Result<(), PeerError> {
        let tx = self
            .nodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(to)
            .cloned()
            .ok_or_else(|| PeerError::Unreachable(to.to_string()))?;
        tx.send(PeerCommand::Incoming(envelope))
            .await
            .map_err(|_| PeerError::Unreachable(to.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(to: &str) -> PeerEnvelope {
        PeerEnvelope {
            to: to.to_string(),
            from: "merchant".to_string(),
            correlation_id: "merchant_1".to_string(),
            response: false,
            payload: json!({"type": "status"}),
        }
    }

    #[tokio::test]
    async fn test_hub_delivers_until_unregistered() {
        let hub = PeerHub::new();
        let (tx, mut rx) = mpsc::channel(4);
        hub.register("ranger", tx);

        hub.send("ranger", envelope("ranger")).await.unwrap();
        assert!(matches!(rx.recv().await, Some(PeerCommand::Incoming(e)) if e.to == "ranger"));

        hub.unregister("ranger");
        let result = hub.send("ranger", envelope("ranger")).await;
        assert_eq!(result, Err(PeerError::Unreachable("ranger".to_string())));
    }
}
