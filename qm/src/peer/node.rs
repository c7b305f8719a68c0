//! Peer node task

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    IncomingRequest, PeerCommand, PeerConfig, PeerEnvelope, PeerHandle, PeerMetrics, PeerResponse, PeerTransport,
};

/// One agent's endpoint for peer request/response
///
/// Correlates outgoing requests with responses by id, synthesizes a
/// timed-out response when none arrives, and hands incoming requests from
/// trusted peers to whoever holds the request receiver.
pub struct PeerNode {
    name: String,
    config: PeerConfig,
    transport: Arc<dyn PeerTransport>,
    tx: mpsc::Sender<PeerCommand>,
    rx: mpsc::Receiver<PeerCommand>,
    requests_tx: mpsc::Sender<IncomingRequest>,
}

impl PeerNode {
    /// Create a node and the receiver its incoming requests arrive on
    pub fn new(
        name: impl Into<String>,
        config: PeerConfig,
        transport: Arc<dyn PeerTransport>,
    ) -> (Self, mpsc::Receiver<IncomingRequest>) {
        let name = name.into();
        debug!(%name, "PeerNode::new: called");
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        let (requests_tx, requests_rx) = mpsc::channel(config.channel_buffer);
        let node = Self {
            name,
            config,
            transport,
            tx,
            rx,
            requests_tx,
        };
        (node, requests_rx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sender for the transport to deliver envelopes on
    pub fn sender(&self) -> mpsc::Sender<PeerCommand> {
        self.tx.clone()
    }

    pub fn handle(&self) -> PeerHandle {
        PeerHandle::new(self.name.clone(), self.tx.clone(), self.config.timeout())
    }

    /// Run the node until shutdown is requested
    pub async fn run(mut self) {
        let mut pending: HashMap<String, oneshot::Sender<PeerResponse>> = HashMap::new();
        let mut metrics = PeerMetrics::default();

        info!(peer = %self.name, "Peer node started");

        while let Some(command) = self.rx.recv().await {
            match command {
                PeerCommand::Request {
                    to,
                    payload,
                    timeout,
                    reply_tx,
                } => {
                    let correlation_id = format!("{}_{}", self.name, Uuid::now_v7());
                    let envelope = PeerEnvelope {
                        to: to.clone(),
                        from: self.name.clone(),
                        correlation_id: correlation_id.clone(),
                        response: false,
                        payload,
                    };

                    if let Err(e) = self.transport.send(&to, envelope).await {
                        warn!(peer = %self.name, %to, error = %e, "Request not delivered");
                        let _ = reply_tx.send(PeerResponse::bad_request(e.to_string()));
                        continue;
                    }
                    debug!(peer = %self.name, %to, %correlation_id, "Request sent");
                    metrics.sent += 1;
                    pending.insert(correlation_id.clone(), reply_tx);
                    metrics.pending = pending.len();

                    let timeout_tx = self.tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(timeout).await;
                        let _ = timeout_tx.send(PeerCommand::Timeout { correlation_id }).await;
                    });
                }

                PeerCommand::Respond { request, response } => {
                    let payload = match serde_json::to_value(&response) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode response");
                            continue;
                        }
                    };
                    let envelope = PeerEnvelope {
                        to: request.from.clone(),
                        from: self.name.clone(),
                        correlation_id: request.correlation_id,
                        response: true,
                        payload,
                    };
                    match self.transport.send(&request.from, envelope).await {
                        Ok(()) => metrics.sent += 1,
                        Err(e) => warn!(peer = %self.name, to = %request.from, error = %e, "Response not delivered"),
                    }
                }

                PeerCommand::Incoming(envelope) => {
                    metrics.received += 1;
                    if envelope.from == self.name || !self.config.is_trusted(&envelope.from) {
                        warn!(peer = %self.name, from = %envelope.from, "Dropping message from untrusted sender");
                        metrics.dropped += 1;
                        continue;
                    }
                    if envelope.to != self.name {
                        debug!(peer = %self.name, to = %envelope.to, "Dropping misaddressed message");
                        metrics.dropped += 1;
                        continue;
                    }

                    if envelope.response {
                        let Some(reply_tx) = pending.remove(&envelope.correlation_id) else {
                            debug!(id = %envelope.correlation_id, "Late or unknown response dropped");
                            continue;
                        };
                        metrics.pending = pending.len();
                        let response = serde_json::from_value(envelope.payload)
                            .unwrap_or_else(|e| PeerResponse::bad_request(format!("Malformed response: {}", e)));
                        let _ = reply_tx.send(response);
                    } else {
                        let request = IncomingRequest::new(envelope, self.handle());
                        if self.requests_tx.send(request).await.is_err() {
                            debug!(peer = %self.name, "No request receiver; request dropped");
                        }
                    }
                }

                PeerCommand::Timeout { correlation_id } => {
                    if let Some(reply_tx) = pending.remove(&correlation_id) {
                        warn!(peer = %self.name, id = %correlation_id, "Request timed out");
                        let _ = reply_tx.send(PeerResponse::timed_out());
                        metrics.pending = pending.len();
                        metrics.timeouts += 1;
                    }
                }

                PeerCommand::GetMetrics { reply_tx } => {
                    let _ = reply_tx.send(metrics.clone());
                }

                PeerCommand::Shutdown => {
                    info!(peer = %self.name, "Peer node shutting down");
                    break;
                }
            }
        }

        info!(peer = %self.name, "Peer node stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{PeerError, PeerHub, ResponseStatus};
    use serde_json::json;
    use std::time::Duration;

    fn config(trusted: &[&str]) -> PeerConfig {
        PeerConfig {
            trusted: trusted.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn spawn_node(
        hub: &PeerHub,
        name: &str,
        trusted: &[&str],
    ) -> (PeerHandle, mpsc::Receiver<IncomingRequest>) {
        let (node, requests) = PeerNode::new(name, config(trusted), Arc::new(hub.clone()));
        hub.register(name, node.sender());
        let handle = node.handle();
        tokio::spawn(node.run());
        (handle, requests)
    }

    #[tokio::test]
    async fn test_request_response() {
        let hub = PeerHub::new();
        let (merchant, _) = spawn_node(&hub, "merchant", &["ranger"]);
        let (_ranger, mut ranger_requests) = spawn_node(&hub, "ranger", &["merchant"]);

        let responder = tokio::spawn(async move {
            let request = ranger_requests.recv().await.unwrap();
            assert_eq!(request.from(), "merchant");
            assert_eq!(request.payload(), &json!({"type": "status"}));
            request.respond(PeerResponse::ok(json!({"gold": 42}))).await.unwrap();
        });

        let response = merchant.request("ranger", json!({"type": "status"})).await.unwrap();
        assert_eq!(response, PeerResponse::ok(json!({"gold": 42})));
        responder.await.unwrap();

        let metrics = merchant.metrics().await.unwrap();
        assert_eq!(metrics.pending, 0);
        assert_eq!(metrics.sent, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_times_out() {
        let hub = PeerHub::new();
        let (merchant, _) = spawn_node(&hub, "merchant", &["ranger"]);
        let (_ranger, _ranger_requests) = spawn_node(&hub, "ranger", &["merchant"]);

        let response = merchant
            .request_with_timeout("ranger", json!({"type": "status"}), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.status, ResponseStatus::TimedOut);
        assert_eq!(response.message, json!("Timed out"));
        assert_eq!(merchant.metrics().await.unwrap().timeouts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_untrusted_sender_is_ignored() {
        let hub = PeerHub::new();
        let (stranger, _) = spawn_node(&hub, "stranger", &["merchant"]);
        let (merchant, mut merchant_requests) = spawn_node(&hub, "merchant", &["ranger"]);

        let response = stranger
            .request_with_timeout("merchant", json!({"type": "status"}), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.status, ResponseStatus::TimedOut);
        assert!(merchant_requests.try_recv().is_err());
        assert_eq!(merchant.metrics().await.unwrap().dropped, 1);
    }

    #[tokio::test]
    async fn test_unknown_peer_is_bad_request() {
        let hub = PeerHub::new();
        let (merchant, _) = spawn_node(&hub, "merchant", &[]);

        let response = merchant.request("nobody", json!({})).await.unwrap();
        assert_eq!(response.status, ResponseStatus::BadRequest);
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let hub = PeerHub::new();
        let (merchant, _) = spawn_node(&hub, "merchant", &[]);
        merchant.shutdown().await.unwrap();
        tokio::task::yield_now().await;

        let result = merchant.request("ranger", json!({})).await;
        assert_eq!(result, Err(PeerError::ChannelClosed));
    }
}
