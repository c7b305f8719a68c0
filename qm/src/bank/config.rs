//! Bank configuration

use serde::{Deserialize, Serialize};

use crate::domain::Destination;

/// Where the bank is and how its containers are shaped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Where the actor has to be for bank operations
    pub location: Destination,

    /// Slots per container
    #[serde(rename = "container-capacity")]
    pub container_capacity: usize,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            location: Destination::map("bank"),
            container_capacity: 42,
        }
    }
}
