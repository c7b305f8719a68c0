//! Stored item payload

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stack or single item occupying one slot, in the bank or in the actor's inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    /// Item name, the identity the ledger groups by
    pub name: String,

    /// Upgrade/compound level, absent for items without levels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    /// Stack quantity; absent for non-stackable items
    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,

    /// Fields the policy layer may need; never interpreted here
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl StoredItem {
    /// A non-stackable item
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            quantity: None,
            meta: Map::new(),
        }
    }

    /// A stackable item with the given quantity
    pub fn stack(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::new(name)
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    /// Effective quantity: non-stackable items count as one
    pub fn quantity(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }

    pub fn is_stackable(&self) -> bool {
        self.quantity.is_some()
    }

    /// Level, treating unlevelled items as level 0
    pub fn level(&self) -> u32 {
        self.level.unwrap_or(0)
    }

    /// Same name and level, i.e. the two could share a stack
    pub fn same_identity(&self, other: &StoredItem) -> bool {
        self.name == other.name && self.level == other.level
    }
}
