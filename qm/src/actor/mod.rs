//! The remote actor boundary
//!
//! [`Actor`] is the only way the merchant touches the game. [`SimActor`] is an
//! in-memory implementation that enforces the same preconditions as the real
//! service; the CLI simulator and the tests run against it.

mod error;
mod sim;
mod traits;

pub use error::ActorError;
pub use sim::{SentItem, SimActor, SimOp, SimState};
pub use traits::Actor;
