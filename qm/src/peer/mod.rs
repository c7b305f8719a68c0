//! Peer request/response
//!
//! Agents exchange JSON envelopes through a [`PeerTransport`]. Each agent
//! runs a [`PeerNode`] that correlates requests with responses and turns a
//! missing response into a timed-out one. Messages from senders outside the
//! trusted list never reach the application.

mod config;
mod error;
mod handle;
mod messages;
mod node;
mod responder;
mod transport;

pub use config::PeerConfig;
pub use error::PeerError;
pub use handle::{IncomingRequest, PeerHandle};
pub use messages::{PeerCommand, PeerEnvelope, PeerMetrics, PeerRequest, PeerResponse, PeerStatus, ResponseStatus};
pub use node::PeerNode;
pub use responder::PeerResponder;
pub use transport::{PeerHub, PeerTransport};
