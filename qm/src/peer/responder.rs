//! Answers requests from trusted peers on behalf of an actor

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{IncomingRequest, PeerRequest, PeerResponse, PeerStatus};
use crate::actor::Actor;

/// Serves [`PeerRequest`]s using one actor
pub struct PeerResponder {
    actor: Arc<dyn Actor>,
}

impl PeerResponder {
    pub fn new(actor: Arc<dyn Actor>) -> Self {
        Self { actor }
    }

    /// Answer requests until the node drops its request channel
    pub async fn serve(self, mut requests: mpsc::Receiver<IncomingRequest>) {
        info!(actor = %self.actor.name(), "Peer responder started");
        while let Some(request) = requests.recv().await {
            let response = self.answer(&request).await;
            if let Err(e) = request.respond(response).await {
                warn!(error = %e, "Failed to send response");
                break;
            }
        }
        info!(actor = %self.actor.name(), "Peer responder stopped");
    }

    pub async fn answer(&self, request: &IncomingRequest) -> PeerResponse {
        debug!(from = %request.from(), "PeerResponder::answer: called");
        let parsed: PeerRequest = match serde_json::from_value(request.payload().clone()) {
            Ok(parsed) => parsed,
            Err(e) => return PeerResponse::bad_request(format!("Unknown request: {}", e)),
        };

        match parsed {
            PeerRequest::Status => match serde_json::to_value(PeerStatus::of(self.actor.as_ref())) {
                Ok(status) => PeerResponse::ok(status),
                Err(e) => PeerResponse::bad_request(e.to_string()),
            },
            PeerRequest::HandOver { keep, gold_reserve } => self.hand_over(request.from(), &keep, gold_reserve).await,
        }
    }

    async fn hand_over(&self, to: &str, keep: &[String], gold_reserve: u64) -> PeerResponse {
        let mut items = 0u32;
        for (slot, item) in self.actor.inventory().occupied() {
            if keep.contains(&item.name) {
                continue;
            }
            match self.actor.send_item(to, slot, item.quantity()).await {
                Ok(()) => items += 1,
                Err(e) => return PeerResponse::bad_request(format!("send {} failed: {}", item.name, e)),
            }
        }

        let surplus = self.actor.gold().saturating_sub(gold_reserve);
        if surplus > 0
            && let Err(e) = self.actor.send_gold(to, surplus).await
        {
            return PeerResponse::bad_request(format!("send gold failed: {}", e));
        }

        info!(%to, %items, gold = %surplus, "Handed over");
        PeerResponse::ok(json!({"items": items, "gold": surplus}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::SimActor;
    use crate::domain::StoredItem;
    use crate::peer::{PeerConfig, PeerHub, PeerNode};

    fn trusting(peer: &str) -> PeerConfig {
        PeerConfig {
            trusted: vec![peer.to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_status_and_hand_over() {
        let hub = PeerHub::new();
        let ranger = Arc::new(
            SimActor::new("ranger", 10)
                .with_item(0, StoredItem::stack("hpot0", 40))
                .with_item(1, StoredItem::new("bow").with_level(3))
                .with_item(2, StoredItem::stack("seashell", 12))
                .with_gold(5_000),
        );

        let (merchant_node, _) = PeerNode::new("merchant", trusting("ranger"), Arc::new(hub.clone()));
        let (ranger_node, ranger_requests) = PeerNode::new("ranger", trusting("merchant"), Arc::new(hub.clone()));
        hub.register("merchant", merchant_node.sender());
        hub.register("ranger", ranger_node.sender());
        let merchant = merchant_node.handle();
        tokio::spawn(merchant_node.run());
        tokio::spawn(ranger_node.run());
        tokio::spawn(PeerResponder::new(ranger.clone()).serve(ranger_requests));

        let response = merchant.ask("ranger", &PeerRequest::Status).await.unwrap();
        assert!(response.is_ok());
        let status: PeerStatus = serde_json::from_value(response.message).unwrap();
        assert_eq!(status.name, "ranger");
        assert_eq!(status.quantity_of("hpot0"), 40);
        assert_eq!(status.free_slots, 7);

        let request = PeerRequest::HandOver {
            keep: vec!["hpot0".to_string(), "bow".to_string()],
            gold_reserve: 1_000,
        };
        let response = merchant.ask("ranger", &request).await.unwrap();
        assert_eq!(response, PeerResponse::ok(json!({"items": 1, "gold": 4_000})));

        let state = ranger.state();
        assert_eq!(state.gold, 1_000);
        assert_eq!(state.sent.len(), 1);
        assert_eq!(state.sent[0].peer, "merchant");
        assert_eq!(state.sent[0].item.name, "seashell");
        assert_eq!(state.gold_sent, vec![("merchant".to_string(), 4_000)]);
    }

    #[tokio::test]
    async fn test_unknown_request_is_bad_request() {
        let hub = PeerHub::new();
        let ranger = Arc::new(SimActor::new("ranger", 4));
        let (merchant_node, _) = PeerNode::new("merchant", trusting("ranger"), Arc::new(hub.clone()));
        let (ranger_node, ranger_requests) = PeerNode::new("ranger", trusting("merchant"), Arc::new(hub.clone()));
        hub.register("merchant", merchant_node.sender());
        hub.register("ranger", ranger_node.sender());
        let merchant = merchant_node.handle();
        tokio::spawn(merchant_node.run());
        tokio::spawn(ranger_node.run());
        tokio::spawn(PeerResponder::new(ranger).serve(ranger_requests));

        let response = merchant.request("ranger", json!({"type": "dance"})).await.unwrap();
        assert_eq!(response.status, crate::peer::ResponseStatus::BadRequest);
    }
}
