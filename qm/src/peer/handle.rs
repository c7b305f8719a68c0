//! PeerHandle - client interface for peer requests

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{PeerCommand, PeerEnvelope, PeerError, PeerMetrics, PeerRequest, PeerResponse};

/// Clonable handle to a running [`PeerNode`](super::PeerNode)
#[derive(Debug, Clone)]
pub struct PeerHandle {
    name: String,
    tx: mpsc::Sender<PeerCommand>,
    default_timeout: Duration,
}

impl PeerHandle {
    pub(super) fn new(name: String, tx: mpsc::Sender<PeerCommand>, default_timeout: Duration) -> Self {
        Self {
            name,
            tx,
            default_timeout,
        }
    }

    /// Name this node answers to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send a request and wait for the response or the default timeout
    pub async fn request(&self, to: &str, payload: Value) -> Result<PeerResponse, PeerError> {
        self.request_with_timeout(to, payload, self.default_timeout).await
    }

    /// Send a request; a missing response resolves to a timed-out response
    pub async fn request_with_timeout(
        &self,
        to: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<PeerResponse, PeerError> {
        debug!(from = %self.name, %to, ?timeout, "PeerHandle::request: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PeerCommand::Request {
                to: to.to_string(),
                payload,
                timeout,
                reply_tx,
            })
            .await
            .map_err(|_| PeerError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PeerError::ChannelClosed)
    }

    /// Send a typed request
    pub async fn ask(&self, to: &str, request: &PeerRequest) -> Result<PeerResponse, PeerError> {
        let payload = serde_json::to_value(request)?;
        self.request(to, payload).await
    }

    /// Answer a request received through this node
    pub async fn respond(&self, request: &PeerEnvelope, response: PeerResponse) -> Result<(), PeerError> {
        debug!(to = %request.from, id = %request.correlation_id, "PeerHandle::respond: called");
        self.tx
            .send(PeerCommand::Respond {
                request: request.clone(),
                response,
            })
            .await
            .map_err(|_| PeerError::ChannelClosed)
    }

    pub async fn metrics(&self) -> Result<PeerMetrics, PeerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PeerCommand::GetMetrics { reply_tx })
            .await
            .map_err(|_| PeerError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PeerError::ChannelClosed)
    }

    pub async fn shutdown(&self) -> Result<(), PeerError> {
        self.tx
            .send(PeerCommand::Shutdown)
            .await
            .map_err(|_| PeerError::ChannelClosed)
    }
}

/// A request waiting for an answer
#[derive(Debug)]
pub struct IncomingRequest {
    envelope: PeerEnvelope,
    handle: PeerHandle,
}

impl IncomingRequest {
    pub(super) fn new(envelope: PeerEnvelope, handle: PeerHandle) -> Self {
        Self { envelope, handle }
    }

    pub fn from(&self) -> &str {
        &self.envelope.from
    }

    pub fn payload(&self) -> &Value {
        &self.envelope.payload
    }

    pub async fn respond(self, response: PeerResponse) -> Result<(), PeerError> {
        self.handle.respond(&self.envelope, response).await
    }
}
