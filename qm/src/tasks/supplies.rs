//! Keeping peers stocked with potions

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::sourcing::{ensure_bank_data, gather};
use super::{REPLENISH_PRIORITY, Session, clean_inventory};
use crate::domain::Destination;
use crate::peer::{PeerRequest, PeerStatus};
use crate::scheduler::{Task, TaskContext, TaskKind};

/// Items one peer is short of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerNeed {
    pub peer: String,
    pub items: Vec<(String, u32)>,
}

/// Periodically ask every peer for its status and enqueue replenishment
pub struct CheckSupplies {
    session: Session,
}

impl CheckSupplies {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Current needs of every peer that answered
    pub async fn survey(&self) -> Vec<PeerNeed> {
        let Some(peers) = &self.session.peers else {
            return Vec::new();
        };
        let names = &self.session.merchant.peers;
        let request = PeerRequest::Status;
        let responses = join_all(names.iter().map(|name| peers.ask(name, &request))).await;

        let mut needs = Vec::new();
        for (name, response) in names.iter().zip(responses) {
            let status: PeerStatus = match response {
                Ok(response) if response.is_ok() => match serde_json::from_value(response.message) {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(peer = %name, error = %e, "Unreadable status");
                        continue;
                    }
                },
                Ok(response) => {
                    debug!(peer = %name, status = ?response.status, "CheckSupplies::survey: no status");
                    continue;
                }
                Err(e) => {
                    warn!(peer = %name, error = %e, "Status request failed");
                    continue;
                }
            };

            let items: Vec<(String, u32)> = self
                .session
                .merchant
                .supplies
                .iter()
                .map(|supply| (supply.item.clone(), supply.shortfall(status.quantity_of(&supply.item))))
                .filter(|(_, quantity)| *quantity > 0)
                .collect();
            if !items.is_empty() {
                needs.push(PeerNeed {
                    peer: name.clone(),
                    items,
                });
            }
        }
        needs
    }
}

#[async_trait]
impl Task for CheckSupplies {
    fn name(&self) -> &str {
        "check_supplies"
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Background {
            interval: self.session.merchant.check_interval(),
        }
    }

    fn cancellable(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &TaskContext) -> Result<()> {
        let needs = self.survey().await;
        if needs.is_empty() {
            debug!("CheckSupplies::run: peers are stocked");
            return Ok(());
        }
        let task = ReplenishPeers::new(self.session.clone(), needs);
        let result = ctx.scheduler().enqueue(Arc::new(task), REPLENISH_PRIORITY).await;
        debug!(?result, "CheckSupplies::run: enqueued");
        Ok(())
    }
}

/// Bring each listed peer what it is short of and collect its loot
pub struct ReplenishPeers {
    session: Session,
    needs: Vec<PeerNeed>,
}

impl ReplenishPeers {
    pub fn new(session: Session, needs: Vec<PeerNeed>) -> Self {
        Self { session, needs }
    }

    /// Send `quantity` of an item from whatever stacks are carried; returns what was sent
    async fn send(&self, peer: &str, item: &str, quantity: u32) -> Result<u32> {
        let actor = self.session.actor.as_ref();
        let mut sent = 0;
        while sent < quantity {
            let inventory = actor.inventory();
            let Some(slot) = inventory.find(item) else {
                break;
            };
            let batch = inventory
                .get(slot)
                .map(|stack| stack.quantity())
                .unwrap_or(0)
                .min(quantity - sent);
            actor.send_item(peer, slot, batch).await?;
            sent += batch;
        }
        Ok(sent)
    }
}

#[async_trait]
impl Task for ReplenishPeers {
    fn name(&self) -> &str {
        "replenish_peers"
    }

    fn display_name(&self) -> &str {
        "Replenish peers"
    }

    fn cancellable(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &TaskContext) -> Result<()> {
        let session = &self.session;
        ensure_bank_data(session).await?;
        let mut totals: BTreeMap<&str, u32> = BTreeMap::new();
        for need in &self.needs {
            for (item, quantity) in &need.items {
                *totals.entry(item.as_str()).or_insert(0) += quantity;
            }
        }
        for (item, quantity) in &totals {
            gather(session, item, *quantity).await?;
        }

        for need in &self.needs {
            if ctx.is_cancelled() {
                info!("Replenishing cancelled");
                break;
            }
            session.actor.move_to(&Destination::peer(&need.peer)).await?;
            for (item, quantity) in &need.items {
                let sent = self.send(&need.peer, item, *quantity).await?;
                info!(peer = %need.peer, %item, %sent, wanted = %quantity, "Supplied");
            }

            if let Some(peers) = &session.peers {
                let request = PeerRequest::HandOver {
                    keep: session.merchant.supply_items(),
                    gold_reserve: session.merchant.peer_gold_reserve,
                };
                match peers.ask(&need.peer, &request).await {
                    Ok(response) if response.is_ok() => debug!(peer = %need.peer, "ReplenishPeers::run: handed over"),
                    Ok(response) => warn!(peer = %need.peer, status = ?response.status, "Hand-over refused"),
                    Err(e) => warn!(peer = %need.peer, error = %e, "Hand-over request failed"),
                }
            }
        }

        clean_inventory(session).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::SimActor;
    use crate::bank::{BankConfig, Ledger};
    use crate::domain::{BankSnapshot, StoredItem};
    use crate::peer::{PeerConfig, PeerHub, PeerNode, PeerResponder};
    use crate::policy::{ItemCatalog, ItemPolicy};
    use crate::scheduler::{CancelToken, SchedulerConfig, TaskId, TaskScheduler};
    use crate::tasks::{MerchantConfig, SupplyTarget};

    fn catalog() -> ItemCatalog {
        ItemCatalog::default().with("hpot0", ItemPolicy::stackable(9999, 20))
    }

    fn merchant() -> MerchantConfig {
        MerchantConfig {
            peers: vec!["ranger".to_string(), "priest".to_string()],
            supplies: vec![SupplyTarget::new("hpot0", 300, 100)],
            gold_reserve: 0,
            ..Default::default()
        }
    }

    fn config(trusted: &[&str]) -> PeerConfig {
        PeerConfig {
            timeout_ms: 1_000,
            trusted: trusted.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Merchant session wired to a ranger that answers and a priest that never does
    fn world(hub: &PeerHub, merchant_actor: Arc<SimActor>) -> (Session, Arc<SimActor>) {
        let (node, _requests) = PeerNode::new("merchant", config(&["ranger", "priest"]), Arc::new(hub.clone()));
        hub.register("merchant", node.sender());
        let handle = node.handle();
        tokio::spawn(node.run());

        let ranger = Arc::new(
            SimActor::new("ranger", 10)
                .with_item(0, StoredItem::stack("hpot0", 40))
                .with_item(1, StoredItem::new("seashell"))
                .with_gold(1_500_000),
        );
        let (ranger_node, ranger_requests) = PeerNode::new("ranger", config(&["merchant"]), Arc::new(hub.clone()));
        hub.register("ranger", ranger_node.sender());
        tokio::spawn(ranger_node.run());
        tokio::spawn(PeerResponder::new(ranger.clone()).serve(ranger_requests));

        // The priest's node runs but nothing answers its requests.
        let (priest_node, _) = PeerNode::new("priest", config(&["merchant"]), Arc::new(hub.clone()));
        hub.register("priest", priest_node.sender());
        tokio::spawn(priest_node.run());

        let session = Session::new(
            merchant_actor,
            Ledger::new(BankConfig::default()),
            catalog(),
            merchant(),
        )
        .with_peers(handle);
        (session, ranger)
    }

    #[tokio::test(start_paused = true)]
    async fn test_survey_skips_silent_peers() {
        let hub = PeerHub::new();
        let actor = Arc::new(SimActor::new("merchant", 10).with_catalog(catalog()));
        let (session, _ranger) = world(&hub, actor);

        let needs = CheckSupplies::new(session).survey().await;
        assert_eq!(
            needs,
            vec![PeerNeed {
                peer: "ranger".to_string(),
                items: vec![("hpot0".to_string(), 260)],
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replenish_sends_potions_and_collects_loot() {
        let hub = PeerHub::new();
        let bank = BankSnapshot::default().with_container("items0", vec![Some(StoredItem::stack("hpot0", 200)), None]);
        let actor = Arc::new(
            SimActor::new("merchant", 10)
                .with_catalog(catalog())
                .with_bank(bank, 4)
                .with_gold(10_000),
        );
        let (session, ranger) = world(&hub, actor.clone());
        let needs = vec![PeerNeed {
            peer: "ranger".to_string(),
            items: vec![("hpot0".to_string(), 260)],
        }];

        let scheduler = TaskScheduler::new("merchant", SchedulerConfig::default());
        let ctx = TaskContext::new(TaskId(1), CancelToken::new(), scheduler.handle());
        ReplenishPeers::new(session.clone(), needs).run(&ctx).await.unwrap();

        let state = actor.state();
        let sent: u32 = state
            .sent
            .iter()
            .filter(|s| s.peer == "ranger" && s.item.name == "hpot0")
            .map(|s| s.item.quantity())
            .sum();
        assert_eq!(sent, 260);
        assert_eq!(state.map, "bank");
        assert_eq!(session.ledger.lock().await.total("hpot0"), 0);
        // 60 bought at 20 each, the rest banked.
        assert_eq!(session.ledger.lock().await.gold(), 10_000 - 60 * 20);

        let ranger_state = ranger.state();
        assert_eq!(ranger_state.sent.len(), 1);
        assert_eq!(ranger_state.sent[0].item.name, "seashell");
        assert_eq!(ranger_state.gold_sent, vec![("merchant".to_string(), 500_000)]);
    }
}
