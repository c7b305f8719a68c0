//! Compounding surplus jewellery in triples

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, info, warn};

use super::sourcing::{ensure_bank_data, gather, move_to_market};
use super::{COMPOUND_PRIORITY, Session, clean_inventory};
use crate::domain::Priority;
use crate::policy::compound_plans;
use crate::scheduler::{Task, TaskContext, TaskKind};

/// Periodically look for compound work
pub struct CheckCompound {
    session: Session,
}

impl CheckCompound {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Task for CheckCompound {
    fn name(&self) -> &str {
        "check_compound"
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
        let triples = {
            let ledger = self.session.ledger.lock().await;
            if !ledger.has_data() {
                return Ok(());
            }
            compound_plans(&ledger, &self.session.catalog).len()
        };
        if triples == 0 {
            return Ok(());
        }
        let task = CompoundItems::new(self.session.clone(), triples);
        let result = ctx.scheduler().enqueue(Arc::new(task), COMPOUND_PRIORITY).await;
        debug!(%triples, ?result, "CheckCompound::run: enqueued");
        Ok(())
    }
}

/// Withdraw planned triples, source scrolls and compound them
///
/// Stops between triples when cancelled and puts everything back.
pub struct CompoundItems {
    session: Session,
    backlog: usize,
}

impl CompoundItems {
    pub fn new(session: Session, backlog: usize) -> Self {
        Self { session, backlog }
    }
}

#[async_trait]
impl Task for CompoundItems {
    fn name(&self) -> &str {
        "compound_items"
    }

    fn display_name(&self) -> &str {
        "Compound items"
    }

    fn cancellable(&self) -> bool {
        true
    }

    fn priority(&self, base: Priority) -> Priority {
        base.with_backlog(30, self.backlog, 300)
    }

    async fn run(&self, ctx: &TaskContext) -> Result<()> {
        let session = &self.session;
        let actor = session.actor.as_ref();
        ensure_bank_data(session).await?;

        // (actor slots, item name, level)
        let mut work: Vec<([usize; 3], String, u32)> = Vec::new();
        {
            let mut ledger = session.ledger.lock().await;
            for plan in compound_plans(&ledger, &session.catalog) {
                if ctx.is_cancelled() {
                    break;
                }
                if actor.inventory().free_count() <= session.merchant.reserved_slots + 3 {
                    debug!("CompoundItems::run: inventory full");
                    break;
                }
                let withdrawn = ledger.withdraw_from(actor, &plan.positions, None).await?;
                match <[usize; 3]>::try_from(withdrawn.iter().map(|w| w.actor_slot).collect::<Vec<_>>()) {
                    Ok(slots) => work.push((slots, plan.name.clone(), plan.level)),
                    Err(partial) => warn!(item = %plan.name, got = %partial.len(), "Triple not withdrawn"),
                }
            }
        }

        let mut needed = [0u32; 2];
        work.retain(|(_, name, level)| match session.catalog.grade(name, *level) {
            Some(grade) => {
                needed[grade] += 1;
                true
            }
            None => false,
        });
        let scrolls = &session.merchant.compound_scrolls;
        for (grade, count) in needed.iter().enumerate() {
            if *count > 0 && !ctx.is_cancelled() {
                gather(session, &scrolls[grade], *count).await?;
            }
        }

        if !work.is_empty() && !ctx.is_cancelled() {
            move_to_market(session).await?;
        }
        let mut combined = 0;
        let mut lost = 0;
        for (slots, name, level) in &work {
            if ctx.is_cancelled() {
                info!("Compounding cancelled");
                break;
            }
            let Some(grade) = session.catalog.grade(name, *level) else {
                continue;
            };
            let Some(scroll_slot) = actor.inventory().find(&scrolls[grade]) else {
                warn!(item = %name, scroll = %scrolls[grade], "Out of scrolls");
                break;
            };
            if actor.compound(*slots, scroll_slot).await? {
                combined += 1;
            } else {
                info!(item = %name, %level, "Compound failed; items lost");
                lost += 1;
            }
        }
        info!(triples = %work.len(), %combined, %lost, "Compounds done");

        clean_inventory(session).await?;
        Ok(())
    }
}
