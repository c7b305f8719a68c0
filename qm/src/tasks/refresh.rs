//! Bank refresh task

use async_trait::async_trait;
use eyre::{Result, bail};
use tracing::info;

use super::Session;
use crate::scheduler::{Task, TaskContext};

/// Move to the bank and rebuild the ledger from the actor's snapshot
pub struct RefreshBank {
    session: Session,
}

impl RefreshBank {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Task for RefreshBank {
    fn name(&self) -> &str {
        "refresh_bank"
    }

    fn display_name(&self) -> &str {
        "Refresh bank"
    }

    fn cancellable(&self) -> bool {
        false
    }

    async fn run(&self, _ctx: &TaskContext) -> Result<()> {
        let mut ledger = self.session.ledger.lock().await;
        if !ledger.sync(self.session.actor.as_ref()).await? {
            bail!("Bank contents unavailable");
        }
        info!(items = %ledger.groups().count(), gold = %ledger.gold(), "Bank refreshed");
        Ok(())
    }
}
