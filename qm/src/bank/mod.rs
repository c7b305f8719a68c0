//! Bank ledger
//!
//! A local model of the remote bank: containers of slots, a reverse index from
//! item name to positions, and the gold balance. The ledger drives the actor
//! through withdraw, deposit, split and swap calls and keeps its model in step
//! with every call that succeeds.

mod config;
mod container;
mod error;
mod group;
mod ledger;
mod store;

pub use config::BankConfig;
pub use container::Container;
pub use error::{BankError, Placement, Rejection, StoreReport, Withdrawal, Withdrawn};
pub use group::ItemGroup;
pub use ledger::Ledger;
