//! The merchant stand, run whenever nothing else is queued

use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, info};

use super::Session;
use super::sourcing::move_to_market;
use crate::scheduler::{Task, TaskContext};

/// Stand at the market with the stand open until cancelled
pub struct OpenStand {
    session: Session,
}

impl OpenStand {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Task for OpenStand {
    fn name(&self) -> &str {
        "open_stand"
    }

    fn display_name(&self) -> &str {
        "Open stand"
    }

    fn cancellable(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &TaskContext) -> Result<()> {
        move_to_market(&self.session).await?;
        if ctx.is_cancelled() {
            return Ok(());
        }
        self.session.actor.set_stand(true).await?;
        info!(map = %self.session.actor.map(), "Stand open");

        ctx.cancelled().await;

        debug!("OpenStand::run: closing");
        self.session.actor.set_stand(false).await?;
        info!("Stand closed");
        Ok(())
    }
}
