//! Merchant tasks
//!
//! Background checks inspect the ledger and peers and enqueue one-shot work;
//! the one-shot tasks drive the actor and finish by cleaning the inventory.

mod clean;
mod compound;
mod config;
mod refresh;
mod sourcing;
mod stand;
mod supplies;
mod upgrade;

use std::sync::Arc;

use eyre::Result;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::actor::Actor;
use crate::bank::Ledger;
use crate::domain::Priority;
use crate::peer::PeerHandle;
use crate::policy::ItemCatalog;
use crate::scheduler::TaskScheduler;

pub use clean::{CleanReport, clean_inventory};
pub use compound::{CheckCompound, CompoundItems};
pub use config::{MerchantConfig, SupplyTarget};
pub use refresh::RefreshBank;
pub use sourcing::{ensure_bank_data, gather};
pub use stand::OpenStand;
pub use supplies::{CheckSupplies, PeerNeed, ReplenishPeers};
pub use upgrade::{CheckUpgrade, UpgradeItems};

pub const REFRESH_PRIORITY: Priority = Priority(1_000);
pub const UPGRADE_PRIORITY: Priority = Priority(100);
pub const COMPOUND_PRIORITY: Priority = Priority(100);
pub const REPLENISH_PRIORITY: Priority = Priority(50);

/// Everything a task needs to act for one merchant
#[derive(Clone)]
pub struct Session {
    pub actor: Arc<dyn Actor>,
    pub ledger: Arc<Mutex<Ledger>>,
    pub catalog: Arc<ItemCatalog>,
    pub merchant: Arc<MerchantConfig>,

    /// Peer messaging, when peers are configured
    pub peers: Option<PeerHandle>,
}

impl Session {
    pub fn new(actor: Arc<dyn Actor>, ledger: Ledger, catalog: ItemCatalog, merchant: MerchantConfig) -> Self {
        Self {
            actor,
            ledger: Arc::new(Mutex::new(ledger)),
            catalog: Arc::new(catalog),
            merchant: Arc::new(merchant),
            peers: None,
        }
    }

    pub fn with_peers(mut self, peers: PeerHandle) -> Self {
        self.peers = Some(peers);
        self
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("actor", &self.actor.name())
            .field("peers", &self.peers.as_ref().map(PeerHandle::name))
            .finish()
    }
}

/// Register the merchant's standing tasks with a scheduler
///
/// Queues an initial bank refresh, arms the background checks and installs
/// the stand as the default task. The supplies check is only armed when
/// peers are configured and a peer handle is present.
pub async fn install(scheduler: &TaskScheduler, session: Session) -> Result<()> {
    debug!(actor = %session.actor.name(), "install: called");
    scheduler
        .enqueue(Arc::new(RefreshBank::new(session.clone())), REFRESH_PRIORITY)
        .await;
    scheduler
        .enqueue(Arc::new(CheckUpgrade::new(session.clone())), Priority::BACKGROUND)
        .await;
    scheduler
        .enqueue(Arc::new(CheckCompound::new(session.clone())), Priority::BACKGROUND)
        .await;
    if session.peers.is_some() && !session.merchant.peers.is_empty() {
        scheduler
            .enqueue(Arc::new(CheckSupplies::new(session.clone())), Priority::BACKGROUND)
            .await;
    }
    scheduler.set_default_task(Arc::new(OpenStand::new(session))).await?;
    info!("Merchant tasks installed");
    Ok(())
}
