//! Domain value types
//!
//! Plain data shared by the ledger, the scheduler and the actor boundary.
//! Nothing in here owns a container or talks to the remote service.

mod destination;
mod item;
mod position;
mod priority;
mod snapshot;

pub use destination::Destination;
pub use item::StoredItem;
pub use position::{ContainerId, Position};
pub use priority::Priority;
pub use snapshot::BankSnapshot;
