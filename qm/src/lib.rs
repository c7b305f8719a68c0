//! Quartermaster - bank ledger and task scheduler for a remote-inventory agent
//!
//! An agent drives a character in a remote game through a narrow set of
//! calls. Quartermaster keeps a local model of the character's bank, runs the
//! character's chores through a priority scheduler and lets characters ask
//! each other for help.
//!
//! # Modules
//!
//! - [`domain`] - Positions, stored items, snapshots and priorities
//! - [`actor`] - The remote actor boundary and an in-memory simulator
//! - [`bank`] - Slot-based bank ledger with stacking and withdraw/split
//! - [`scheduler`] - Cooperative priority scheduler for one actor
//! - [`peer`] - Request/response messaging between actors
//! - [`policy`] - Item catalog and upgrade/compound planning
//! - [`tasks`] - The merchant's standing and one-shot tasks
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod actor;
pub mod bank;
pub mod cli;
pub mod config;
pub mod domain;
pub mod peer;
pub mod policy;
pub mod scheduler;
pub mod tasks;

// Re-export commonly used types
pub use actor::{Actor, ActorError, SimActor};
pub use bank::{BankConfig, BankError, Ledger, StoreReport, Withdrawal};
pub use config::Config;
pub use domain::{BankSnapshot, ContainerId, Destination, Position, Priority, StoredItem};
pub use peer::{PeerConfig, PeerError, PeerHandle, PeerHub, PeerNode, PeerRequest, PeerResponder, PeerResponse};
pub use policy::{ItemCatalog, ItemPolicy};
pub use scheduler::{SchedulerConfig, SchedulerHandle, Task, TaskContext, TaskKind, TaskScheduler, TickOutcome};
pub use tasks::{MerchantConfig, Session};
