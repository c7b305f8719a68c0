//! Upgrading surplus copies of gear

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, info, warn};

use super::sourcing::{ensure_bank_data, gather, move_to_market};
use super::{REFRESH_PRIORITY, RefreshBank, Session, UPGRADE_PRIORITY, clean_inventory};
use crate::bank::Withdrawal;
use crate::domain::Priority;
use crate::policy::upgrade_plans;
use crate::scheduler::{Task, TaskContext, TaskKind};

/// Periodically look for upgrade work
pub struct CheckUpgrade {
    session: Session,
}

impl CheckUpgrade {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Task for CheckUpgrade {
    fn name(&self) -> &str {
        "check_upgrade"
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
        let plans = {
            let ledger = self.session.ledger.lock().await;
            ledger
                .has_data()
                .then(|| upgrade_plans(&ledger, &self.session.catalog).len())
        };
        match plans {
            None => {
                debug!("CheckUpgrade::run: no bank data, requesting refresh");
                ctx.scheduler()
                    .enqueue(Arc::new(RefreshBank::new(self.session.clone())), REFRESH_PRIORITY)
                    .await;
            }
            Some(0) => debug!("CheckUpgrade::run: nothing to upgrade"),
            Some(backlog) => {
                let task = UpgradeItems::new(self.session.clone(), backlog);
                let result = ctx.scheduler().enqueue(Arc::new(task), UPGRADE_PRIORITY).await;
                debug!(%backlog, ?result, "CheckUpgrade::run: enqueued");
            }
        }
        Ok(())
    }
}

/// Withdraw planned copies, source scrolls and upgrade them
pub struct UpgradeItems {
    session: Session,
    backlog: usize,
}

impl UpgradeItems {
    pub fn new(session: Session, backlog: usize) -> Self {
        Self { session, backlog }
    }
}

#[async_trait]
impl Task for UpgradeItems {
    fn name(&self) -> &str {
        "upgrade_items"
    }

    fn display_name(&self) -> &str {
        "Upgrade items"
    }

    fn cancellable(&self) -> bool {
        false
    }

    fn priority(&self, base: Priority) -> Priority {
        base.with_backlog(10, self.backlog, 100)
    }

    async fn run(&self, _ctx: &TaskContext) -> Result<()> {
        let session = &self.session;
        let actor = session.actor.as_ref();
        ensure_bank_data(session).await?;

        // (actor slot, item name, target level)
        let mut work: Vec<(usize, String, u32)> = Vec::new();
        {
            let mut ledger = session.ledger.lock().await;
            let plans = upgrade_plans(&ledger, &session.catalog);
            'plans: for plan in plans {
                for position in &plan.positions {
                    // The last slot is the ledger's scratch slot.
                    if actor.inventory().free_count() <= session.merchant.reserved_slots + 1 {
                        debug!("UpgradeItems::run: inventory full");
                        break 'plans;
                    }
                    match ledger.withdraw(actor, position, None).await? {
                        Withdrawal::Moved(withdrawn) => {
                            work.push((withdrawn.actor_slot, plan.name.clone(), plan.target_level));
                        }
                        Withdrawal::Rejected(reason) => {
                            warn!(%position, ?reason, "Upgrade copy not withdrawn");
                        }
                    }
                }
            }
        }
        if work.is_empty() {
            clean_inventory(session).await?;
            return Ok(());
        }

        let mut needed = [0u32; 2];
        let inventory = actor.inventory();
        for (slot, name, target) in &work {
            let level = inventory.get(*slot).map(|item| item.level()).unwrap_or(*target);
            for step in level..*target {
                match session.catalog.grade(name, step) {
                    Some(grade) => needed[grade] += 1,
                    None => break,
                }
            }
        }
        let scrolls = &session.merchant.upgrade_scrolls;
        for (grade, count) in needed.iter().enumerate() {
            if *count > 0 {
                gather(session, &scrolls[grade], *count).await?;
            }
        }

        move_to_market(session).await?;
        let mut upgraded = 0;
        let mut lost = 0;
        for (slot, name, target) in &work {
            loop {
                let inventory = actor.inventory();
                let Some(level) = inventory.get(*slot).map(|item| item.level()) else {
                    break;
                };
                if level >= *target {
                    break;
                }
                let Some(grade) = session.catalog.grade(name, level) else {
                    break;
                };
                let Some(scroll_slot) = inventory.find(&scrolls[grade]) else {
                    warn!(item = %name, scroll = %scrolls[grade], "Out of scrolls");
                    break;
                };
                if actor.upgrade(*slot, scroll_slot).await? {
                    upgraded += 1;
                } else {
                    info!(item = %name, %level, "Upgrade failed; item lost");
                    lost += 1;
                    break;
                }
            }
        }
        info!(copies = %work.len(), %upgraded, %lost, "Upgrades done");

        clean_inventory(session).await?;
        Ok(())
    }
}
