//! Bank error and outcome types

use thiserror::Error;

use crate::actor::ActorError;
use crate::domain::{Position, StoredItem};

/// Errors that abort a ledger operation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BankError {
    #[error("Remote operation failed: {0}")]
    Remote(#[from] ActorError),
}

/// Why a ledger operation was skipped without touching the remote side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The position is outside any known container
    InvalidSlot(Position),

    /// The position is valid but holds nothing
    EmptySlot(Position),

    /// A quantity of zero was requested
    ZeroQuantity,

    /// The actor has no usable free inventory slot
    NoActorSlot,

    /// The ledger has not been refreshed, or a previous sequence failed midway
    Stale,
}

/// An item that landed in the actor's inventory
#[derive(Debug, Clone, PartialEq)]
pub struct Withdrawn {
    pub actor_slot: usize,
    pub quantity: u32,
    pub item: StoredItem,
}

/// Result of a single withdraw
#[derive(Debug, Clone, PartialEq)]
pub enum Withdrawal {
    Moved(Withdrawn),
    Rejected(Rejection),
}

impl Withdrawal {
    pub fn moved(self) -> Option<Withdrawn> {
        match self {
            Self::Moved(w) => Some(w),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved(_))
    }
}

/// Where one inventory stack ended up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    pub actor_slot: usize,

    /// Existing stacks that absorbed part of the quantity
    pub merged_into: Vec<Position>,

    /// New slot the remainder was deposited into
    pub deposited_at: Option<Position>,
}

/// Outcome of a store call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreReport {
    /// Stacks fully placed in the bank
    pub placed: Vec<Placement>,

    /// Actor slots (or their remainders) that found no room
    pub unstored: Vec<usize>,

    /// Merges made for slots whose remainder then found no room
    pub partial: Vec<Placement>,

    /// Actor slots that were empty when their turn came
    pub missing: Vec<usize>,
}

impl StoreReport {
    pub fn stored_count(&self) -> usize {
        self.placed.len()
    }
}
