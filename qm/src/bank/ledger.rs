//! Local model of the remote bank

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::{BankConfig, BankError, Container, ItemGroup, Rejection, Withdrawal, Withdrawn};
use crate::actor::Actor;
use crate::domain::{BankSnapshot, ContainerId, Position, StoredItem};

/// Containers, the name index over them, and the gold balance
///
/// Every mutating operation takes `&mut self` for its whole remote sequence;
/// callers share a ledger behind a mutex so two sequences never interleave.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: BankConfig,
    gold: u64,
    pub(super) containers: BTreeMap<ContainerId, Container>,
    pub(super) groups: BTreeMap<String, ItemGroup>,
    refreshed: bool,
    stale: bool,
}

impl Ledger {
    pub fn new(config: BankConfig) -> Self {
        debug!(location = %config.location, "Ledger::new: called");
        Self {
            config,
            gold: 0,
            containers: BTreeMap::new(),
            groups: BTreeMap::new(),
            refreshed: false,
            stale: false,
        }
    }

    /// A ledger already refreshed from a snapshot
    pub fn from_snapshot(config: BankConfig, snapshot: BankSnapshot) -> Self {
        let mut ledger = Self::new(config);
        ledger.refresh(snapshot);
        ledger
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    /// Refreshed and not invalidated by a failed sequence since
    pub fn has_data(&self) -> bool {
        self.refreshed && !self.stale
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Known bank gold; zero until refreshed
    pub fn gold(&self) -> u64 {
        if self.refreshed { self.gold } else { 0 }
    }

    /// Replace all local state with an authoritative snapshot
    pub fn refresh(&mut self, snapshot: BankSnapshot) {
        debug!(containers = %snapshot.containers.len(), "Ledger::refresh: called");
        self.containers.clear();
        self.groups.clear();

        for (id, slots) in snapshot.containers {
            let container = Container::with_slots(id.clone(), slots, self.config.container_capacity);
            for (slot, item) in container.occupied() {
                self.groups
                    .entry(item.name.clone())
                    .or_insert_with(|| ItemGroup::new(item.name.clone()))
                    .insert(Position::new(id.clone(), slot));
            }
            self.containers.insert(id, container);
        }

        self.gold = snapshot.gold;
        self.refreshed = true;
        self.stale = false;
        info!(
            containers = %self.containers.len(),
            groups = %self.groups.len(),
            gold = %self.gold,
            "Ledger refreshed"
        );
    }

    /// Move to the bank if needed and refresh from the actor's snapshot
    ///
    /// Returns `false` when the actor reported no snapshot.
    pub async fn sync(&mut self, actor: &dyn Actor) -> Result<bool, BankError> {
        debug!("Ledger::sync: called");
        self.move_to_bank(actor).await?;
        match actor.bank_snapshot().await? {
            Some(snapshot) => {
                self.refresh(snapshot);
                Ok(true)
            }
            None => {
                warn!("Ledger::sync: actor reported no bank snapshot");
                Ok(false)
            }
        }
    }

    pub(super) fn mark_stale(&mut self) {
        warn!("Ledger marked stale; refresh required");
        self.stale = true;
    }

    pub(super) async fn move_to_bank(&self, actor: &dyn Actor) -> Result<(), BankError> {
        let here = actor.map();
        if self.config.location.map_name() == Some(here.as_str()) {
            return Ok(());
        }
        debug!(from = %here, to = %self.config.location, "Ledger::move_to_bank: moving");
        actor.move_to(&self.config.location).await?;
        Ok(())
    }

    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.get(id)
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn group(&self, name: &str) -> Option<&ItemGroup> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &ItemGroup> {
        self.groups.values()
    }

    pub fn item_at(&self, position: &Position) -> Option<&StoredItem> {
        self.containers.get(&position.container)?.get(position.slot)
    }

    /// Positions and items matching a predicate, in name order
    pub fn find_positions<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = (&'a Position, &'a StoredItem)> + 'a
    where
        F: Fn(&StoredItem) -> bool + 'a,
    {
        self.groups
            .values()
            .flat_map(|group| group.positions().iter())
            .filter_map(move |position| self.item_at(position).map(|item| (position, item)))
            .filter(move |(_, item)| predicate(item))
    }

    /// Positions of one item name, optionally filtered
    pub fn positions_of<F>(&self, name: &str, predicate: F) -> Vec<Position>
    where
        F: Fn(&StoredItem) -> bool,
    {
        let Some(group) = self.groups.get(name) else {
            return Vec::new();
        };
        group
            .positions()
            .iter()
            .filter(|position| self.item_at(position).is_some_and(&predicate))
            .cloned()
            .collect()
    }

    /// Total quantity of an item name across the bank
    pub fn total(&self, name: &str) -> u32 {
        self.positions_of(name, |_| true)
            .iter()
            .filter_map(|position| self.item_at(position))
            .map(StoredItem::quantity)
            .sum()
    }

    pub fn free_slots(&self) -> usize {
        self.containers.values().map(Container::free_count).sum()
    }

    /// First free slot across containers in container order
    pub(super) fn allocate(&self) -> Option<Position> {
        self.containers
            .values()
            .find_map(|container| container.free_slot().map(|slot| Position::new(container.id().clone(), slot)))
    }

    pub(super) fn insert_at(&mut self, position: Position, item: StoredItem) {
        let name = item.name.clone();
        let Some(container) = self.containers.get_mut(&position.container) else {
            warn!(%position, "Ledger::insert_at: unknown container");
            return;
        };
        if let Err(item) = container.try_place(position.slot, item) {
            warn!(%position, item = %item.name, "Ledger::insert_at: slot out of range");
            return;
        }
        self.groups
            .entry(name.clone())
            .or_insert_with(|| ItemGroup::new(name))
            .insert(position);
    }

    pub(super) fn remove_at(&mut self, position: &Position) -> Option<StoredItem> {
        let item = self.containers.get_mut(&position.container)?.take(position.slot)?;
        if let Some(group) = self.groups.get_mut(&item.name) {
            group.remove(position);
            if group.is_empty() {
                self.groups.remove(&item.name);
            }
        }
        Some(item)
    }

    /// Check that the name index and the slots describe each other exactly
    pub fn check_consistency(&self) -> Result<(), String> {
        for group in self.groups.values() {
            if group.is_empty() {
                return Err(format!("empty group {}", group.name()));
            }
            for position in group.positions() {
                match self.item_at(position) {
                    Some(item) if item.name == group.name() => {}
                    Some(item) => {
                        return Err(format!("{} indexed as {} but holds {}", position, group.name(), item.name));
                    }
                    None => return Err(format!("{} indexed as {} but is empty", position, group.name())),
                }
            }
        }
        for container in self.containers.values() {
            for (slot, item) in container.occupied() {
                let position = Position::new(container.id().clone(), slot);
                if !self.groups.get(&item.name).is_some_and(|g| g.contains(&position)) {
                    return Err(format!("{} holds {} but is not indexed", position, item.name));
                }
            }
        }
        Ok(())
    }

    /// Move a stack, or part of one, into the actor's inventory
    ///
    /// A partial withdraw uses the last inventory slot as scratch: the whole
    /// stack is withdrawn there, the requested part split off, and the rest
    /// deposited back into the same position. A failure in that sequence
    /// leaves the ledger stale.
    pub async fn withdraw(
        &mut self,
        actor: &dyn Actor,
        position: &Position,
        quantity: Option<u32>,
    ) -> Result<Withdrawal, BankError> {
        debug!(%position, ?quantity, "Ledger::withdraw: called");
        if quantity == Some(0) {
            return Ok(Withdrawal::Rejected(Rejection::ZeroQuantity));
        }
        let item = match self.lookup(position) {
            Ok(item) => item,
            Err(reason) => return Ok(Withdrawal::Rejected(reason)),
        };

        let inventory = actor.inventory();
        let Some(scratch) = inventory.capacity().checked_sub(1) else {
            return Ok(Withdrawal::Rejected(Rejection::NoActorSlot));
        };
        let held = item.quantity();

        match quantity {
            Some(wanted) if wanted < held => {
                if inventory.get(scratch).is_some() {
                    debug!(%scratch, "Ledger::withdraw: scratch slot occupied");
                    return Ok(Withdrawal::Rejected(Rejection::NoActorSlot));
                }
                if inventory.free_slots().iter().all(|slot| *slot >= scratch) {
                    return Ok(Withdrawal::Rejected(Rejection::NoActorSlot));
                }
                self.move_to_bank(actor).await?;
                self.withdraw_part(actor, position, item, wanted, scratch).await
            }
            _ => {
                let Some(actor_slot) = inventory.free_slot().filter(|slot| *slot < scratch) else {
                    return Ok(Withdrawal::Rejected(Rejection::NoActorSlot));
                };
                self.withdraw_whole(actor, position, item, actor_slot).await
            }
        }
    }

    /// Withdraw a whole stack into any free inventory slot, scratch included
    ///
    /// Merging never splits, so the scratch slot is fair game here.
    pub(super) async fn withdraw_for_merge(
        &mut self,
        actor: &dyn Actor,
        position: &Position,
    ) -> Result<Withdrawal, BankError> {
        let item = match self.lookup(position) {
            Ok(item) => item,
            Err(reason) => return Ok(Withdrawal::Rejected(reason)),
        };
        let Some(actor_slot) = actor.inventory().free_slot() else {
            return Ok(Withdrawal::Rejected(Rejection::NoActorSlot));
        };
        self.withdraw_whole(actor, position, item, actor_slot).await
    }

    /// The stack at `position`, or why it cannot be withdrawn
    fn lookup(&self, position: &Position) -> Result<StoredItem, Rejection> {
        if !self.has_data() {
            return Err(Rejection::Stale);
        }
        let container = self
            .containers
            .get(&position.container)
            .filter(|c| c.in_range(position.slot))
            .ok_or_else(|| Rejection::InvalidSlot(position.clone()))?;
        container
            .get(position.slot)
            .cloned()
            .ok_or_else(|| Rejection::EmptySlot(position.clone()))
    }

    async fn withdraw_whole(
        &mut self,
        actor: &dyn Actor,
        position: &Position,
        item: StoredItem,
        actor_slot: usize,
    ) -> Result<Withdrawal, BankError> {
        self.move_to_bank(actor).await?;
        actor
            .withdraw_item(&position.container, position.slot, actor_slot)
            .await?;
        self.remove_at(position);
        let quantity = item.quantity();
        debug!(%position, %actor_slot, %quantity, "Ledger::withdraw: moved whole stack");
        Ok(Withdrawal::Moved(Withdrawn {
            actor_slot,
            quantity,
            item,
        }))
    }

    async fn withdraw_part(
        &mut self,
        actor: &dyn Actor,
        position: &Position,
        item: StoredItem,
        wanted: u32,
        scratch: usize,
    ) -> Result<Withdrawal, BankError> {
        if let Err(e) = actor
            .withdraw_item(&position.container, position.slot, scratch)
            .await
        {
            self.mark_stale();
            return Err(e.into());
        }
        let actor_slot = match actor.split_stack(scratch, wanted).await {
            Ok(slot) => slot,
            Err(e) => {
                self.mark_stale();
                return Err(e.into());
            }
        };
        if let Err(e) = actor
            .deposit_item(scratch, &position.container, position.slot)
            .await
        {
            self.mark_stale();
            return Err(e.into());
        }

        let held = item.quantity();
        if let Some(stack) = self
            .containers
            .get_mut(&position.container)
            .and_then(|c| c.get_mut(position.slot))
        {
            stack.quantity = Some(held - wanted);
        }
        debug!(%position, %actor_slot, %wanted, left = %(held - wanted), "Ledger::withdraw: split stack");
        Ok(Withdrawal::Moved(Withdrawn {
            actor_slot,
            quantity: wanted,
            item: StoredItem {
                quantity: Some(wanted),
                ..item
            },
        }))
    }

    /// Withdraw from several positions in order until `quantity` is reached
    ///
    /// With `None` every position is withdrawn whole. Rejected positions are
    /// skipped; remote failures abort.
    pub async fn withdraw_from(
        &mut self,
        actor: &dyn Actor,
        positions: &[Position],
        quantity: Option<u32>,
    ) -> Result<Vec<Withdrawn>, BankError> {
        debug!(positions = %positions.len(), ?quantity, "Ledger::withdraw_from: called");
        let mut grabbed = Vec::new();
        let mut total = 0u32;
        for position in positions {
            let remaining = quantity.map(|q| q.saturating_sub(total));
            if remaining == Some(0) {
                break;
            }
            match self.withdraw(actor, position, remaining).await? {
                Withdrawal::Moved(withdrawn) => {
                    total += withdrawn.quantity;
                    grabbed.push(withdrawn);
                }
                Withdrawal::Rejected(reason) => {
                    debug!(%position, ?reason, "Ledger::withdraw_from: skipped");
                    if matches!(reason, Rejection::NoActorSlot | Rejection::Stale) {
                        break;
                    }
                }
            }
        }
        Ok(grabbed)
    }

    /// Withdraw up to `quantity` of an item name
    pub async fn withdraw_named(
        &mut self,
        actor: &dyn Actor,
        name: &str,
        quantity: u32,
    ) -> Result<Vec<Withdrawn>, BankError> {
        let positions = self.positions_of(name, |_| true);
        self.withdraw_from(actor, &positions, Some(quantity)).await
    }

    /// Deposit gold, clamped to `[1, held]`; nothing happens with no gold held or a stale ledger
    pub async fn deposit_gold(&mut self, actor: &dyn Actor, amount: u64) -> Result<u64, BankError> {
        debug!(%amount, "Ledger::deposit_gold: called");
        let held = actor.gold();
        if !self.has_data() || held == 0 {
            return Ok(0);
        }
        let amount = amount.clamp(1, held);
        self.move_to_bank(actor).await?;
        actor.deposit_gold(amount).await?;
        self.gold += amount;
        info!(%amount, bank_gold = %self.gold, "Deposited gold");
        Ok(amount)
    }

    /// Withdraw gold, clamped to `[1, banked]`; nothing happens with no gold banked or a stale ledger
    pub async fn withdraw_gold(&mut self, actor: &dyn Actor, amount: u64) -> Result<u64, BankError> {
        debug!(%amount, "Ledger::withdraw_gold: called");
        let banked = self.gold();
        if !self.has_data() || banked == 0 {
            return Ok(0);
        }
        let amount = amount.clamp(1, banked);
        self.move_to_bank(actor).await?;
        actor.withdraw_gold(amount).await?;
        self.gold -= amount;
        info!(%amount, bank_gold = %self.gold, "Withdrew gold");
        Ok(amount)
    }
}
