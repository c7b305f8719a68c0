//! Container ids and positions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a bank container (e.g. `items0`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ContainerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// `(container, slot)` coordinate of a potentially stored item
///
/// A lookup key only; resolve it through the ledger to get the item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub container: ContainerId,
    pub slot: usize,
}

impl Position {
    pub fn new(container: impl Into<ContainerId>, slot: usize) -> Self {
        Self {
            container: container.into(),
            slot,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.container, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new("items0", 7).to_string(), "items0[7]");
    }

    #[test]
    fn test_positions_order_by_container_then_slot() {
        let mut positions = vec![
            Position::new("items1", 0),
            Position::new("items0", 5),
            Position::new("items0", 2),
        ];
        positions.sort();
        assert_eq!(positions[0], Position::new("items0", 2));
        assert_eq!(positions[2], Position::new("items1", 0));
    }
}
