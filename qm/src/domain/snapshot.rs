//! Authoritative bank snapshot as reported by the remote service

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ContainerId, StoredItem};

/// Gold balance plus the slot contents of every container
///
/// Serialized flat: `{"gold": 10, "items0": [{"name": "hpot0", "q": 20}, null]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankSnapshot {
    #[serde(default)]
    pub gold: u64,

    #[serde(flatten)]
    pub containers: BTreeMap<ContainerId, Vec<Option<StoredItem>>>,
}

impl BankSnapshot {
    pub fn with_container(mut self, id: impl Into<ContainerId>, slots: Vec<Option<StoredItem>>) -> Self {
        self.containers.insert(id.into(), slots);
        self
    }

    pub fn with_gold(mut self, gold: u64) -> Self {
        self.gold = gold;
        self
    }
}
