//! Actor trait definition

use async_trait::async_trait;

use super::ActorError;
use crate::bank::Container;
use crate::domain::{BankSnapshot, ContainerId, Destination};

/// The remote character the merchant drives
///
/// Every async method is one remote call. Calls may take arbitrarily long and
/// may fail; none of them is retried here. The synchronous accessors read the
/// most recently reported state and never block.
#[async_trait]
pub trait Actor: Send + Sync {
    /// Character name, used as the peer identity
    fn name(&self) -> &str;

    /// Map the actor is currently on
    fn map(&self) -> String;

    fn gold(&self) -> u64;

    /// Snapshot of the carried items
    fn inventory(&self) -> Container;

    async fn move_to(&self, destination: &Destination) -> Result<(), ActorError>;

    /// Bank contents, or `None` when the actor is not at the bank
    async fn bank_snapshot(&self) -> Result<Option<BankSnapshot>, ActorError>;

    /// Move a bank slot into an empty inventory slot
    async fn withdraw_item(&self, container: &ContainerId, slot: usize, actor_slot: usize) -> Result<(), ActorError>;

    /// Move an inventory slot into an empty bank slot
    async fn deposit_item(&self, actor_slot: usize, container: &ContainerId, slot: usize) -> Result<(), ActorError>;

    /// Split `quantity` off a stack; returns the slot holding the split-off part
    async fn split_stack(&self, actor_slot: usize, quantity: u32) -> Result<usize, ActorError>;

    /// Swap two inventory slots, or combine them when they hold the same stackable item
    ///
    /// When combining, `from` is poured onto `onto` up to the stack limit and
    /// whatever does not fit stays in `from`.
    async fn swap_slots(&self, from: usize, onto: usize) -> Result<(), ActorError>;

    /// Buy from a vendor; returns the slot the purchase landed in
    async fn buy(&self, item: &str, quantity: u32) -> Result<usize, ActorError>;

    async fn sell(&self, actor_slot: usize, quantity: u32) -> Result<(), ActorError>;

    async fn send_item(&self, peer: &str, actor_slot: usize, quantity: u32) -> Result<(), ActorError>;

    async fn send_gold(&self, peer: &str, amount: u64) -> Result<(), ActorError>;

    async fn deposit_gold(&self, amount: u64) -> Result<(), ActorError>;

    async fn withdraw_gold(&self, amount: u64) -> Result<(), ActorError>;

    /// Upgrade one item with a scroll; `false` means the attempt failed and the item is gone
    async fn upgrade(&self, actor_slot: usize, scroll_slot: usize) -> Result<bool, ActorError>;

    /// Combine three identical items with a scroll; `false` means they were lost
    async fn compound(&self, slots: [usize; 3], scroll_slot: usize) -> Result<bool, ActorError>;

    /// Open or close the merchant stand
    async fn set_stand(&self, open: bool) -> Result<(), ActorError>;
}
