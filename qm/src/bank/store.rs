//! Placing inventory stacks into the bank

use tracing::{debug, info, warn};

use super::{BankError, Ledger, Placement, StoreReport, Withdrawal};
use crate::actor::Actor;
use crate::domain::{Position, StoredItem};
use crate::policy::ItemCatalog;

impl Ledger {
    /// Store inventory slots, topping up existing stacks before using new slots
    ///
    /// For a stackable item, existing stacks of the same name and level with
    /// room left are merged into, most room first. Each candidate is tried at
    /// most once, and only candidates present when placement of that slot
    /// started are considered. Whatever remains goes into the first free
    /// slot of the first container that has one, or is reported unstored
    /// along with any merges already made for it.
    pub async fn store(
        &mut self,
        actor: &dyn Actor,
        slots: &[usize],
        catalog: &ItemCatalog,
    ) -> Result<StoreReport, BankError> {
        debug!(?slots, "Ledger::store: called");
        let mut report = StoreReport::default();
        if !self.has_data() {
            warn!("Ledger::store: no bank data, nothing stored");
            report.unstored = slots.to_vec();
            return Ok(report);
        }

        let mut ordered = slots.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        for slot in ordered {
            let Some(item) = actor.inventory().get(slot).cloned() else {
                report.missing.push(slot);
                continue;
            };
            let mut placement = Placement {
                actor_slot: slot,
                ..Default::default()
            };
            let mut remaining = item.quantity();

            if item.is_stackable()
                && let Some(max) = catalog.stack_size(&item.name)
            {
                for position in self.merge_candidates(&item, max) {
                    match self.merge_into(actor, slot, &position, remaining, max).await? {
                        Some(moved) => {
                            remaining -= moved;
                            placement.merged_into.push(position);
                        }
                        None => break,
                    }
                    if remaining == 0 {
                        break;
                    }
                }
            }

            if remaining > 0 {
                let Some(position) = self.allocate() else {
                    warn!(%slot, item = %item.name, %remaining, "Ledger::store: bank is full");
                    report.unstored.push(slot);
                    if !placement.merged_into.is_empty() {
                        report.partial.push(placement);
                    }
                    continue;
                };
                self.move_to_bank(actor).await?;
                actor
                    .deposit_item(slot, &position.container, position.slot)
                    .await?;
                let stored = if item.is_stackable() {
                    StoredItem {
                        quantity: Some(remaining),
                        ..item.clone()
                    }
                } else {
                    item.clone()
                };
                self.insert_at(position.clone(), stored);
                placement.deposited_at = Some(position);
            }

            debug!(%slot, item = %item.name, merged = %placement.merged_into.len(), "Ledger::store: placed");
            report.placed.push(placement);
        }

        info!(
            stored = %report.stored_count(),
            unstored = %report.unstored.len(),
            "Stored inventory"
        );
        Ok(report)
    }

    /// Stacks of the same identity with room left, most room first
    fn merge_candidates(&self, item: &StoredItem, max: u32) -> Vec<Position> {
        let mut candidates: Vec<(Position, u32)> = self
            .find_positions(|stored| stored.name == item.name)
            .filter(|(_, stored)| stored.same_identity(item) && stored.quantity() < max)
            .map(|(position, stored)| (position.clone(), max - stored.quantity()))
            .collect();
        candidates.sort_by(|(pa, ra), (pb, rb)| rb.cmp(ra).then_with(|| pa.cmp(pb)));
        candidates.into_iter().map(|(position, _)| position).collect()
    }

    /// Pull a bank stack out, pour the inventory slot onto it, put it back
    ///
    /// Returns the quantity absorbed, or `None` when the bank stack could not
    /// be withdrawn.
    async fn merge_into(
        &mut self,
        actor: &dyn Actor,
        slot: usize,
        position: &Position,
        remaining: u32,
        max: u32,
    ) -> Result<Option<u32>, BankError> {
        let withdrawn = match self.withdraw_for_merge(actor, position).await? {
            Withdrawal::Moved(withdrawn) => withdrawn,
            Withdrawal::Rejected(reason) => {
                debug!(%position, ?reason, "Ledger::merge_into: cannot withdraw candidate");
                return Ok(None);
            }
        };
        let moved = max.saturating_sub(withdrawn.quantity).min(remaining);

        actor.swap_slots(slot, withdrawn.actor_slot).await?;
        actor
            .deposit_item(withdrawn.actor_slot, &position.container, position.slot)
            .await?;

        let merged = StoredItem {
            quantity: Some(withdrawn.quantity + moved),
            ..withdrawn.item
        };
        self.insert_at(position.clone(), merged);
        debug!(%position, %moved, "Ledger::merge_into: merged");
        Ok(Some(moved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{SimActor, SimOp};
    use crate::bank::BankConfig;
    use crate::domain::{BankSnapshot, ContainerId};
    use crate::policy::ItemPolicy;
    use proptest::prelude::*;

    fn catalog() -> ItemCatalog {
        ItemCatalog::default()
            .with("hpot0", ItemPolicy::stackable(9999, 20))
            .with("mpot0", ItemPolicy::stackable(100, 20))
    }

    #[tokio::test]
    async fn test_store_merges_into_existing_stack() {
        let snapshot = BankSnapshot::default().with_container(
            "items0",
            vec![Some(StoredItem::stack("hpot0", 200)), Some(StoredItem::stack("hpot0", 50))],
        );
        let actor = SimActor::new("merchant", 42)
            .with_catalog(catalog())
            .with_bank(snapshot.clone(), 42)
            .with_item(3, StoredItem::stack("hpot0", 30));
        let mut ledger = Ledger::from_snapshot(BankConfig::default(), snapshot);

        let report = ledger.store(&actor, &[3], &catalog()).await.unwrap();

        assert_eq!(report.stored_count(), 1);
        assert_eq!(report.placed[0].merged_into.len(), 1);
        assert_eq!(report.placed[0].deposited_at, None);

        assert_eq!(ledger.total("hpot0"), 280);
        assert_eq!(ledger.item_at(&Position::new("items0", 0)).map(StoredItem::quantity), Some(200));
        assert_eq!(ledger.item_at(&Position::new("items0", 1)).map(StoredItem::quantity), Some(80));
        assert_eq!(ledger.free_slots(), 40);
        assert!(actor.inventory().get(3).is_none());
        ledger.check_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_store_overflow_spills_into_new_slot() {
        let snapshot = BankSnapshot::default().with_container("items0", vec![Some(StoredItem::stack("mpot0", 90))]);
        let actor = SimActor::new("merchant", 42)
            .with_catalog(catalog())
            .with_bank(snapshot.clone(), 42)
            .with_item(0, StoredItem::stack("mpot0", 30));
        let mut ledger = Ledger::from_snapshot(BankConfig::default(), snapshot);

        let report = ledger.store(&actor, &[0], &catalog()).await.unwrap();

        let placement = &report.placed[0];
        assert_eq!(placement.merged_into, vec![Position::new("items0", 0)]);
        assert_eq!(placement.deposited_at, Some(Position::new("items0", 1)));
        assert_eq!(ledger.item_at(&Position::new("items0", 0)).map(StoredItem::quantity), Some(100));
        assert_eq!(ledger.item_at(&Position::new("items0", 1)).map(StoredItem::quantity), Some(20));
        assert_eq!(actor.bank_contents().containers[&ContainerId::new("items0")].len(), 2);
        ledger.check_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_store_tops_up_every_candidate_before_spilling() {
        let snapshot = BankSnapshot::default().with_container(
            "items0",
            vec![Some(StoredItem::stack("mpot0", 95)), Some(StoredItem::stack("mpot0", 90))],
        );
        let actor = SimActor::new("merchant", 42)
            .with_catalog(catalog())
            .with_bank(snapshot.clone(), 42)
            .with_item(0, StoredItem::stack("mpot0", 30));
        let mut ledger = Ledger::from_snapshot(BankConfig::default(), snapshot);

        let report = ledger.store(&actor, &[0], &catalog()).await.unwrap();

        let placement = &report.placed[0];
        // Most room first.
        assert_eq!(
            placement.merged_into,
            vec![Position::new("items0", 1), Position::new("items0", 0)]
        );
        assert_eq!(placement.deposited_at, Some(Position::new("items0", 2)));
        assert_eq!(ledger.item_at(&Position::new("items0", 0)).map(StoredItem::quantity), Some(100));
        assert_eq!(ledger.item_at(&Position::new("items0", 1)).map(StoredItem::quantity), Some(100));
        assert_eq!(ledger.item_at(&Position::new("items0", 2)).map(StoredItem::quantity), Some(15));
        ledger.check_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_store_merges_through_the_scratch_slot() {
        let snapshot = BankSnapshot::default().with_container("items0", vec![Some(StoredItem::stack("hpot0", 50)), None]);
        // Slot 2 is the only free slot and doubles as scratch.
        let actor = SimActor::new("merchant", 3)
            .with_catalog(catalog())
            .with_bank(snapshot.clone(), 42)
            .with_item(0, StoredItem::stack("hpot0", 30))
            .with_item(1, StoredItem::new("junk"));
        let mut ledger = Ledger::from_snapshot(BankConfig::default(), snapshot);

        let report = ledger.store(&actor, &[0], &catalog()).await.unwrap();

        assert_eq!(report.placed[0].merged_into, vec![Position::new("items0", 0)]);
        assert_eq!(report.placed[0].deposited_at, None);
        assert_eq!(ledger.group("hpot0").map(|g| g.len()), Some(1));
        assert_eq!(ledger.total("hpot0"), 80);
        assert!(actor.inventory().get(0).is_none());
        assert!(actor.inventory().get(2).is_none());
        ledger.check_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_store_reports_merges_when_remainder_has_no_room() {
        let config = BankConfig {
            container_capacity: 2,
            ..Default::default()
        };
        let snapshot = BankSnapshot::default().with_container(
            "items0",
            vec![Some(StoredItem::stack("mpot0", 90)), Some(StoredItem::new("junk"))],
        );
        let actor = SimActor::new("merchant", 42)
            .with_catalog(catalog())
            .with_bank(snapshot.clone(), 2)
            .with_item(0, StoredItem::stack("mpot0", 30));
        let mut ledger = Ledger::from_snapshot(config, snapshot);

        let report = ledger.store(&actor, &[0], &catalog()).await.unwrap();

        assert_eq!(report.stored_count(), 0);
        assert_eq!(report.unstored, vec![0]);
        assert_eq!(report.partial.len(), 1);
        assert_eq!(report.partial[0].merged_into, vec![Position::new("items0", 0)]);
        assert_eq!(report.partial[0].deposited_at, None);
        assert_eq!(ledger.item_at(&Position::new("items0", 0)).map(StoredItem::quantity), Some(100));
        assert_eq!(actor.inventory().get(0).map(StoredItem::quantity), Some(20));
        ledger.check_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_store_never_merges_across_levels() {
        let snapshot = BankSnapshot::default().with_container(
            "items0",
            vec![Some(StoredItem::stack("hpot0", 5).with_level(1))],
        );
        let actor = SimActor::new("merchant", 42)
            .with_catalog(catalog())
            .with_bank(snapshot.clone(), 42)
            .with_item(0, StoredItem::stack("hpot0", 5));
        let mut ledger = Ledger::from_snapshot(BankConfig::default(), snapshot);

        let report = ledger.store(&actor, &[0], &catalog()).await.unwrap();
        assert!(report.placed[0].merged_into.is_empty());
        assert_eq!(ledger.group("hpot0").map(|g| g.len()), Some(2));
    }

    #[tokio::test]
    async fn test_store_reports_unstored_when_full() {
        let mut slots = vec![Some(StoredItem::new("junk")); 40];
        slots.extend([None, None]);
        let snapshot = BankSnapshot::default().with_container("items0", slots);
        let actor = SimActor::new("merchant", 42)
            .with_catalog(catalog())
            .with_bank(snapshot.clone(), 42)
            .with_item(0, StoredItem::new("ring"))
            .with_item(1, StoredItem::new("bow"))
            .with_item(2, StoredItem::new("wand"));
        let mut ledger = Ledger::from_snapshot(BankConfig::default(), snapshot);

        let report = ledger.store(&actor, &[2, 0, 1], &catalog()).await.unwrap();

        assert_eq!(report.stored_count(), 2);
        assert_eq!(report.unstored, vec![2]);
        assert_eq!(ledger.free_slots(), 0);
        assert_eq!(actor.inventory().get(2).map(|i| i.name.as_str()), Some("wand"));
        ledger.check_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_store_skips_empty_slots() {
        let snapshot = BankSnapshot::default().with_container("items0", vec![]);
        let actor = SimActor::new("merchant", 42).with_bank(snapshot.clone(), 42);
        let mut ledger = Ledger::from_snapshot(BankConfig::default(), snapshot);

        let report = ledger.store(&actor, &[5], &catalog()).await.unwrap();
        assert_eq!(report.missing, vec![5]);
        assert!(!actor.calls().contains(&SimOp::Deposit));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Store(usize),
        Withdraw(usize, Option<u32>),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8).prop_map(Op::Store),
            (0usize..6, proptest::option::of(1u32..120)).prop_map(|(slot, q)| Op::Withdraw(slot, q)),
        ]
    }

    fn seed_item(i: usize) -> StoredItem {
        match i % 3 {
            0 => StoredItem::stack("hpot0", 40 + i as u32),
            1 => StoredItem::stack("mpot0", 10 * i as u32 % 100 + 1),
            _ => StoredItem::new("ring").with_level(i as u32 % 3),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn test_store_opens_no_slot_while_a_candidate_has_room(
            stacks in proptest::collection::vec(1u32..=100, 0..5),
            incoming in 1u32..=100,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let snapshot = BankSnapshot::default().with_container(
                    "items0",
                    stacks.iter().map(|q| Some(StoredItem::stack("mpot0", *q))).collect(),
                );
                let actor = SimActor::new("merchant", 4)
                    .with_catalog(catalog())
                    .with_bank(snapshot.clone(), 8)
                    .with_item(0, StoredItem::stack("mpot0", incoming));
                let mut ledger = Ledger::from_snapshot(
                    BankConfig { container_capacity: 8, ..Default::default() },
                    snapshot,
                );

                let report = ledger.store(&actor, &[0], &catalog()).await.unwrap();

                assert_eq!(report.stored_count(), 1);
                assert_eq!(ledger.total("mpot0"), stacks.iter().sum::<u32>() + incoming);
                if let Some(opened) = &report.placed[0].deposited_at {
                    for (position, item) in ledger.find_positions(|item| item.name == "mpot0") {
                        if position != opened {
                            assert_eq!(item.quantity(), 100, "{} still had room", position);
                        }
                    }
                }
                ledger.check_consistency().unwrap();
            });
        }

        #[test]
        fn test_ledger_tracks_remote_bank(ops in proptest::collection::vec(op(), 1..24)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let snapshot = BankSnapshot::default()
                    .with_container("items0", (0..6).map(|i| Some(seed_item(i))).collect())
                    .with_container("items1", vec![None, Some(seed_item(7))]);
                let mut actor = SimActor::new("merchant", 10).with_catalog(catalog()).with_bank(snapshot.clone(), 6);
                for i in 0..8 {
                    actor = actor.with_item(i, seed_item(i + 10));
                }
                let mut ledger = Ledger::from_snapshot(
                    BankConfig { container_capacity: 6, ..Default::default() },
                    snapshot,
                );

                for op in ops {
                    match op {
                        Op::Store(slot) => {
                            ledger.store(&actor, &[slot], &catalog()).await.unwrap();
                        }
                        Op::Withdraw(slot, quantity) => {
                            let container = if slot % 2 == 0 { "items0" } else { "items1" };
                            ledger.withdraw(&actor, &Position::new(container, slot), quantity).await.unwrap();
                        }
                    }
                    ledger.check_consistency().unwrap();

                    let remote = actor.bank_contents();
                    for (id, slots) in &remote.containers {
                        for (slot, item) in slots.iter().enumerate() {
                            assert_eq!(ledger.item_at(&Position::new(id.clone(), slot)), item.as_ref());
                        }
                    }
                }
            });
        }
    }
}
