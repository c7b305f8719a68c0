//! Message types for peer request/response

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::actor::Actor;

/// Response status codes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ResponseStatus {
    Ok,
    BadRequest,
    TimedOut,
}

impl From<ResponseStatus> for u16 {
    fn from(status: ResponseStatus) -> Self {
        match status {
            ResponseStatus::Ok => 200,
            ResponseStatus::BadRequest => 400,
            ResponseStatus::TimedOut => 408,
        }
    }
}

impl TryFrom<u16> for ResponseStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Self::Ok),
            400 => Ok(Self::BadRequest),
            408 => Ok(Self::TimedOut),
            other => Err(format!("Unknown status code: {}", other)),
        }
    }
}

/// Answer to a peer request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerResponse {
    pub status: ResponseStatus,
    pub message: Value,
}

impl PeerResponse {
    pub fn ok(message: Value) -> Self {
        Self {
            status: ResponseStatus::Ok,
            message,
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::BadRequest,
            message: Value::String(reason.into()),
        }
    }

    /// Synthesized locally when no response arrives in time
    pub fn timed_out() -> Self {
        Self {
            status: ResponseStatus::TimedOut,
            message: Value::String("Timed out".to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

/// What travels between peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEnvelope {
    pub to: String,
    pub from: String,
    #[serde(rename = "correlation-id")]
    pub correlation_id: String,
    pub response: bool,
    pub payload: Value,
}

/// Requests a peer agent understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PeerRequest {
    /// Report a [`PeerStatus`]
    Status,

    /// Send the requester every item not named in `keep`, and gold above `gold-reserve`
    HandOver {
        #[serde(default)]
        keep: Vec<String>,
        #[serde(rename = "gold-reserve", default)]
        gold_reserve: u64,
    },
}

/// A peer's view of itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerStatus {
    pub name: String,
    pub map: String,
    pub gold: u64,
    #[serde(rename = "free-slots")]
    pub free_slots: usize,

    /// Total quantity per item name
    pub items: BTreeMap<String, u32>,
}

impl PeerStatus {
    pub fn of(actor: &dyn Actor) -> Self {
        let inventory = actor.inventory();
        let mut items = BTreeMap::new();
        for (_, item) in inventory.occupied() {
            *items.entry(item.name.clone()).or_insert(0) += item.quantity();
        }
        Self {
            name: actor.name().to_string(),
            map: actor.map(),
            gold: actor.gold(),
            free_slots: inventory.free_count(),
            items,
        }
    }

    pub fn quantity_of(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }
}

/// Commands processed by a [`PeerNode`](super::PeerNode)
#[derive(Debug)]
pub enum PeerCommand {
    /// Send a request and wait for its response
    Request {
        to: String,
        payload: Value,
        timeout: Duration,
        reply_tx: oneshot::Sender<PeerResponse>,
    },

    /// Answer a request received earlier
    Respond {
        request: PeerEnvelope,
        response: PeerResponse,
    },

    /// Envelope delivered by the transport
    Incoming(PeerEnvelope),

    /// Request timeout notification (internal)
    Timeout { correlation_id: String },

    GetMetrics {
        reply_tx: oneshot::Sender<PeerMetrics>,
    },

    Shutdown,
}

/// Node metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerMetrics {
    pub pending: usize,
    pub sent: u64,
    pub received: u64,
    pub timeouts: u64,
    pub dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes_on_the_wire() {
        let json = serde_json::to_value(PeerResponse::timed_out()).unwrap();
        assert_eq!(json, json!({"status": 408, "message": "Timed out"}));

        let parsed: PeerResponse = serde_json::from_value(json!({"status": 200, "message": {"gold": 5}})).unwrap();
        assert!(parsed.is_ok());

        assert!(serde_json::from_value::<PeerResponse>(json!({"status": 500, "message": null})).is_err());
    }

    #[test]
    fn test_request_tags() {
        let json = serde_json::to_value(PeerRequest::HandOver {
            keep: vec!["hpot0".to_string()],
            gold_reserve: 100,
        })
        .unwrap();
        assert_eq!(json, json!({"type": "hand-over", "keep": ["hpot0"], "gold-reserve": 100}));

        let status: PeerRequest = serde_json::from_value(json!({"type": "status"})).unwrap();
        assert_eq!(status, PeerRequest::Status);
    }

    #[test]
    fn test_envelope_keys() {
        let envelope = PeerEnvelope {
            to: "ranger".to_string(),
            from: "merchant".to_string(),
            correlation_id: "merchant_1".to_string(),
            response: false,
            payload: json!({"type": "status"}),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["correlation-id"], "merchant_1");
    }
}
