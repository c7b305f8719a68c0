//! In-memory actor
//!
//! Holds a character, its inventory, and a bank in one mutex. Every call
//! checks the same preconditions the game does (location, slot occupancy,
//! funds) so ledger bugs surface as errors instead of silently passing.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{Actor, ActorError};
use crate::bank::Container;
use crate::domain::{BankSnapshot, ContainerId, Destination, StoredItem};
use crate::policy::ItemCatalog;

/// Remote operations, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    Move,
    BankSnapshot,
    Withdraw,
    Deposit,
    Split,
    Swap,
    Buy,
    Sell,
    SendItem,
    SendGold,
    DepositGold,
    WithdrawGold,
    Upgrade,
    Compound,
    Stand,
}

impl SimOp {
    fn as_str(&self) -> &'static str {
        match self {
            SimOp::Move => "move",
            SimOp::BankSnapshot => "bank_snapshot",
            SimOp::Withdraw => "withdraw",
            SimOp::Deposit => "deposit",
            SimOp::Split => "split",
            SimOp::Swap => "swap",
            SimOp::Buy => "buy",
            SimOp::Sell => "sell",
            SimOp::SendItem => "send_item",
            SimOp::SendGold => "send_gold",
            SimOp::DepositGold => "deposit_gold",
            SimOp::WithdrawGold => "withdraw_gold",
            SimOp::Upgrade => "upgrade",
            SimOp::Compound => "compound",
            SimOp::Stand => "stand",
        }
    }
}

/// An item handed to a peer
#[derive(Debug, Clone, PartialEq)]
pub struct SentItem {
    pub peer: String,
    pub item: StoredItem,
}

/// Full simulated world state
#[derive(Debug, Clone)]
pub struct SimState {
    pub map: String,
    pub gold: u64,
    pub inventory: Container,
    pub bank_map: String,
    pub bank: BTreeMap<ContainerId, Container>,
    pub bank_gold: u64,
    pub stand_open: bool,
    pub catalog: ItemCatalog,
    pub calls: Vec<SimOp>,
    pub sent: Vec<SentItem>,
    pub gold_sent: Vec<(String, u64)>,

    /// Levels at which upgrade attempts fail, per item name
    pub fragile: HashMap<String, u32>,

    failures: HashMap<SimOp, usize>,
}

/// Actor backed by [`SimState`]
#[derive(Debug)]
pub struct SimActor {
    name: String,
    state: Mutex<SimState>,
}

impl SimActor {
    pub fn new(name: impl Into<String>, inventory_size: usize) -> Self {
        let name = name.into();
        debug!(%name, %inventory_size, "SimActor::new: called");
        Self {
            name,
            state: Mutex::new(SimState {
                map: "main".to_string(),
                gold: 0,
                inventory: Container::new("inventory", inventory_size),
                bank_map: "bank".to_string(),
                bank: BTreeMap::new(),
                bank_gold: 0,
                stand_open: false,
                catalog: ItemCatalog::default(),
                calls: Vec::new(),
                sent: Vec::new(),
                gold_sent: Vec::new(),
                fragile: HashMap::new(),
                failures: HashMap::new(),
            }),
        }
    }

    /// Seed the bank from a snapshot, padding every container to `capacity`
    pub fn with_bank(self, snapshot: BankSnapshot, capacity: usize) -> Self {
        {
            let mut state = self.lock();
            state.bank_gold = snapshot.gold;
            state.bank = snapshot
                .containers
                .into_iter()
                .map(|(id, slots)| (id.clone(), Container::with_slots(id, slots, capacity)))
                .collect();
        }
        self
    }

    pub fn with_bank_map(self, map: impl Into<String>) -> Self {
        self.lock().bank_map = map.into();
        self
    }

    pub fn with_item(self, slot: usize, item: StoredItem) -> Self {
        // Out-of-range seeds are dropped.
        let _ = self.lock().inventory.try_place(slot, item);
        self
    }

    pub fn with_gold(self, gold: u64) -> Self {
        self.lock().gold = gold;
        self
    }

    pub fn with_catalog(self, catalog: ItemCatalog) -> Self {
        self.lock().catalog = catalog;
        self
    }

    pub fn at(self, map: impl Into<String>) -> Self {
        self.lock().map = map.into();
        self
    }

    /// Upgrades of `name` starting from `level` fail and destroy the item
    pub fn with_fragile(self, name: impl Into<String>, level: u32) -> Self {
        self.lock().fragile.insert(name.into(), level);
        self
    }

    /// Make the `nth` next call of `op` (1-based) fail
    pub fn fail_on(&self, op: SimOp, nth: usize) {
        debug!(?op, %nth, "SimActor::fail_on: called");
        self.lock().failures.insert(op, nth.max(1));
    }

    /// Clone of the whole state
    pub fn state(&self) -> SimState {
        self.lock().clone()
    }

    pub fn calls(&self) -> Vec<SimOp> {
        self.lock().calls.clone()
    }

    /// The bank as the game sees it, regardless of location
    pub fn bank_contents(&self) -> BankSnapshot {
        snapshot_of(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and apply any injected failure
    fn begin(&self, op: SimOp) -> Result<MutexGuard<'_, SimState>, ActorError> {
        let mut state = self.lock();
        state.calls.push(op);
        if let Some(remaining) = state.failures.get_mut(&op) {
            *remaining -= 1;
            if *remaining == 0 {
                state.failures.remove(&op);
                debug!(?op, "SimActor::begin: injected failure");
                return Err(ActorError::Rejected {
                    op: op.as_str(),
                    reason: "injected failure".to_string(),
                });
            }
        }
        Ok(state)
    }
}

fn snapshot_of(state: &SimState) -> BankSnapshot {
    BankSnapshot {
        gold: state.bank_gold,
        containers: state
            .bank
            .iter()
            .map(|(id, container)| (id.clone(), container.slots().to_vec()))
            .collect(),
    }
}

fn require_bank(state: &SimState, op: &'static str) -> Result<(), ActorError> {
    if state.map == state.bank_map {
        Ok(())
    } else {
        Err(ActorError::WrongLocation {
            op,
            expected: state.bank_map.clone(),
            actual: state.map.clone(),
        })
    }
}

fn require_item(container: &Container, slot: usize) -> Result<&StoredItem, ActorError> {
    container.get(slot).ok_or(ActorError::EmptySlot { slot })
}

fn require_empty(container: &Container, slot: usize) -> Result<(), ActorError> {
    if !container.in_range(slot) {
        return Err(ActorError::Rejected {
            op: "slot",
            reason: format!("slot {} out of range", slot),
        });
    }
    match container.get(slot) {
        Some(_) => Err(ActorError::SlotOccupied { slot }),
        None => Ok(()),
    }
}

/// Remove `quantity` from an inventory stack, returning the removed part
fn take_quantity(inventory: &mut Container, slot: usize, quantity: u32) -> Result<StoredItem, ActorError> {
    let item = require_item(inventory, slot)?.clone();
    let held = item.quantity();
    if quantity == 0 || quantity > held {
        return Err(ActorError::Rejected {
            op: "quantity",
            reason: format!("cannot take {} of {}", quantity, held),
        });
    }
    if quantity == held {
        inventory.take(slot);
        return Ok(item);
    }
    if let Some(stack) = inventory.get_mut(slot) {
        stack.quantity = Some(held - quantity);
    }
    Ok(StoredItem {
        quantity: Some(quantity),
        ..item
    })
}

#[async_trait]
impl Actor for SimActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn map(&self) -> String {
        self.lock().map.clone()
    }

    fn gold(&self) -> u64 {
        self.lock().gold
    }

    fn inventory(&self) -> Container {
        self.lock().inventory.clone()
    }

    async fn move_to(&self, destination: &Destination) -> Result<(), ActorError> {
        debug!(%destination, "SimActor::move_to: called");
        let mut state = self.begin(SimOp::Move)?;
        state.map = match destination {
            Destination::Map { map } | Destination::Point { map, .. } => map.clone(),
            Destination::Peer { name } => format!("near:{}", name),
        };
        Ok(())
    }

    async fn bank_snapshot(&self) -> Result<Option<BankSnapshot>, ActorError> {
        let state = self.begin(SimOp::BankSnapshot)?;
        if state.map != state.bank_map {
            return Ok(None);
        }
        Ok(Some(snapshot_of(&state)))
    }

    async fn withdraw_item(&self, container: &ContainerId, slot: usize, actor_slot: usize) -> Result<(), ActorError> {
        debug!(%container, %slot, %actor_slot, "SimActor::withdraw_item: called");
        let mut state = self.begin(SimOp::Withdraw)?;
        require_bank(&state, "withdraw")?;
        require_empty(&state.inventory, actor_slot)?;
        let item = state
            .bank
            .get_mut(container)
            .and_then(|c| c.take(slot))
            .ok_or(ActorError::EmptySlot { slot })?;
        let _ = state.inventory.try_place(actor_slot, item);
        Ok(())
    }

    async fn deposit_item(&self, actor_slot: usize, container: &ContainerId, slot: usize) -> Result<(), ActorError> {
        debug!(%actor_slot, %container, %slot, "SimActor::deposit_item: called");
        let mut state = self.begin(SimOp::Deposit)?;
        require_bank(&state, "deposit")?;
        require_item(&state.inventory, actor_slot)?;
        let target = state.bank.get(container).ok_or_else(|| ActorError::Rejected {
            op: "deposit",
            reason: format!("unknown container {}", container),
        })?;
        require_empty(target, slot)?;

        let Some(item) = state.inventory.take(actor_slot) else {
            return Err(ActorError::EmptySlot { slot: actor_slot });
        };
        if let Some(target) = state.bank.get_mut(container) {
            let _ = target.try_place(slot, item);
        }
        Ok(())
    }

    async fn split_stack(&self, actor_slot: usize, quantity: u32) -> Result<usize, ActorError> {
        debug!(%actor_slot, %quantity, "SimActor::split_stack: called");
        let mut state = self.begin(SimOp::Split)?;
        let held = require_item(&state.inventory, actor_slot)?.quantity();
        if quantity == 0 || quantity >= held {
            return Err(ActorError::Rejected {
                op: "split",
                reason: format!("cannot split {} off {}", quantity, held),
            });
        }
        let target = state.inventory.free_slot().ok_or(ActorError::InventoryFull)?;
        let part = take_quantity(&mut state.inventory, actor_slot, quantity)?;
        let _ = state.inventory.try_place(target, part);
        Ok(target)
    }

    async fn swap_slots(&self, from: usize, onto: usize) -> Result<(), ActorError> {
        debug!(%from, %onto, "SimActor::swap_slots: called");
        let mut state = self.begin(SimOp::Swap)?;
        let capacity = state.inventory.capacity();
        if from >= capacity || onto >= capacity {
            return Err(ActorError::Rejected {
                op: "swap",
                reason: "slot out of range".to_string(),
            });
        }

        let source = state.inventory.get(from).cloned();
        let target = state.inventory.get(onto).cloned();
        if let (Some(source), Some(target)) = (&source, &target)
            && source.same_identity(target)
            && let Some(max) = state.catalog.stack_size(&source.name)
        {
            let room = max.saturating_sub(target.quantity());
            let moved = room.min(source.quantity());
            if let Some(stack) = state.inventory.get_mut(onto) {
                stack.quantity = Some(target.quantity() + moved);
            }
            if moved == source.quantity() {
                state.inventory.take(from);
            } else if let Some(stack) = state.inventory.get_mut(from) {
                stack.quantity = Some(source.quantity() - moved);
            }
            return Ok(());
        }

        state.inventory.take(from);
        state.inventory.take(onto);
        if let Some(item) = source {
            let _ = state.inventory.try_place(onto, item);
        }
        if let Some(item) = target {
            let _ = state.inventory.try_place(from, item);
        }
        Ok(())
    }

    async fn buy(&self, item: &str, quantity: u32) -> Result<usize, ActorError> {
        debug!(%item, %quantity, "SimActor::buy: called");
        let mut state = self.begin(SimOp::Buy)?;
        let policy = state.catalog.get(item).cloned().ok_or_else(|| ActorError::Rejected {
            op: "buy",
            reason: format!("{} is not sold here", item),
        })?;
        let cost = policy.price.saturating_mul(u64::from(quantity));
        if cost > state.gold {
            return Err(ActorError::InsufficientFunds {
                needed: cost,
                available: state.gold,
            });
        }

        let slot = match policy.stack_size {
            Some(max) => {
                if quantity > max {
                    return Err(ActorError::Rejected {
                        op: "buy",
                        reason: format!("{} exceeds stack size {}", quantity, max),
                    });
                }
                let existing = state
                    .inventory
                    .occupied()
                    .find(|(_, held)| held.name == item && held.quantity() + quantity <= max)
                    .map(|(slot, _)| slot);
                match existing {
                    Some(slot) => {
                        if let Some(stack) = state.inventory.get_mut(slot) {
                            stack.quantity = Some(stack.quantity() + quantity);
                        }
                        slot
                    }
                    None => {
                        let slot = state.inventory.free_slot().ok_or(ActorError::InventoryFull)?;
                        let _ = state.inventory.try_place(slot, StoredItem::stack(item, quantity));
                        slot
                    }
                }
            }
            None => {
                let free = state.inventory.free_slots();
                let wanted = usize::try_from(quantity).unwrap_or(usize::MAX);
                if quantity == 0 || free.len() < wanted {
                    return Err(ActorError::InventoryFull);
                }
                for slot in free.iter().take(wanted) {
                    let _ = state.inventory.try_place(*slot, StoredItem::new(item).with_level(0));
                }
                free[0]
            }
        };
        state.gold -= cost;
        Ok(slot)
    }

    async fn sell(&self, actor_slot: usize, quantity: u32) -> Result<(), ActorError> {
        debug!(%actor_slot, %quantity, "SimActor::sell: called");
        let mut state = self.begin(SimOp::Sell)?;
        let sold = take_quantity(&mut state.inventory, actor_slot, quantity)?;
        let price = state.catalog.price(&sold.name);
        state.gold += price.saturating_mul(u64::from(quantity));
        Ok(())
    }

    async fn send_item(&self, peer: &str, actor_slot: usize, quantity: u32) -> Result<(), ActorError> {
        debug!(%peer, %actor_slot, %quantity, "SimActor::send_item: called");
        let mut state = self.begin(SimOp::SendItem)?;
        let item = take_quantity(&mut state.inventory, actor_slot, quantity)?;
        state.sent.push(SentItem {
            peer: peer.to_string(),
            item,
        });
        Ok(())
    }

    async fn send_gold(&self, peer: &str, amount: u64) -> Result<(), ActorError> {
        debug!(%peer, %amount, "SimActor::send_gold: called");
        let mut state = self.begin(SimOp::SendGold)?;
        if amount > state.gold {
            return Err(ActorError::InsufficientFunds {
                needed: amount,
                available: state.gold,
            });
        }
        state.gold -= amount;
        state.gold_sent.push((peer.to_string(), amount));
        Ok(())
    }

    async fn deposit_gold(&self, amount: u64) -> Result<(), ActorError> {
        debug!(%amount, "SimActor::deposit_gold: called");
        let mut state = self.begin(SimOp::DepositGold)?;
        require_bank(&state, "deposit_gold")?;
        if amount > state.gold {
            return Err(ActorError::InsufficientFunds {
                needed: amount,
                available: state.gold,
            });
        }
        state.gold -= amount;
        state.bank_gold += amount;
        Ok(())
    }

    async fn withdraw_gold(&self, amount: u64) -> Result<(), ActorError> {
        debug!(%amount, "SimActor::withdraw_gold: called");
        let mut state = self.begin(SimOp::WithdrawGold)?;
        require_bank(&state, "withdraw_gold")?;
        if amount > state.bank_gold {
            return Err(ActorError::InsufficientFunds {
                needed: amount,
                available: state.bank_gold,
            });
        }
        state.bank_gold -= amount;
        state.gold += amount;
        Ok(())
    }

    async fn upgrade(&self, actor_slot: usize, scroll_slot: usize) -> Result<bool, ActorError> {
        debug!(%actor_slot, %scroll_slot, "SimActor::upgrade: called");
        let mut state = self.begin(SimOp::Upgrade)?;
        let item = require_item(&state.inventory, actor_slot)?.clone();
        require_item(&state.inventory, scroll_slot)?;
        take_quantity(&mut state.inventory, scroll_slot, 1)?;

        if state.fragile.get(&item.name).is_some_and(|level| item.level() >= *level) {
            state.inventory.take(actor_slot);
            return Ok(false);
        }
        if let Some(stack) = state.inventory.get_mut(actor_slot) {
            stack.level = Some(item.level() + 1);
        }
        Ok(true)
    }

    async fn compound(&self, slots: [usize; 3], scroll_slot: usize) -> Result<bool, ActorError> {
        debug!(?slots, %scroll_slot, "SimActor::compound: called");
        let mut state = self.begin(SimOp::Compound)?;
        let first = require_item(&state.inventory, slots[0])?.clone();
        for slot in &slots[1..] {
            let other = require_item(&state.inventory, *slot)?;
            if !other.same_identity(&first) || *slot == slots[0] {
                return Err(ActorError::Rejected {
                    op: "compound",
                    reason: "items differ".to_string(),
                });
            }
        }
        require_item(&state.inventory, scroll_slot)?;
        take_quantity(&mut state.inventory, scroll_slot, 1)?;

        state.inventory.take(slots[1]);
        state.inventory.take(slots[2]);
        if state.fragile.get(&first.name).is_some_and(|level| first.level() >= *level) {
            state.inventory.take(slots[0]);
            return Ok(false);
        }
        if let Some(item) = state.inventory.get_mut(slots[0]) {
            item.level = Some(first.level() + 1);
        }
        Ok(true)
    }

    async fn set_stand(&self, open: bool) -> Result<(), ActorError> {
        debug!(%open, "SimActor::set_stand: called");
        let mut state = self.begin(SimOp::Stand)?;
        state.stand_open = open;
        Ok(())
    }
}
