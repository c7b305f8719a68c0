//! Merchant behaviour configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Destination;

/// Potion levels a peer should carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyTarget {
    pub item: String,

    /// Quantity a replenished peer ends up with
    pub target: u32,

    /// Replenish once a peer holds less than this
    #[serde(rename = "low-water")]
    pub low_water: u32,
}

impl SupplyTarget {
    pub fn new(item: impl Into<String>, target: u32, low_water: u32) -> Self {
        Self {
            item: item.into(),
            target,
            low_water,
        }
    }

    /// Quantity to send a peer holding `have`, zero when above low water
    pub fn shortfall(&self, have: u32) -> u32 {
        if have < self.low_water {
            self.target.saturating_sub(have)
        } else {
            0
        }
    }
}

/// What the merchant does between tasks and what it holds on to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    /// Where scrolls and potions are bought and the stand is opened
    pub market: Destination,

    /// Items cleanup never sells or stores
    pub keep: Vec<String>,

    /// Gold kept on hand; anything above is banked after a task
    #[serde(rename = "gold-reserve")]
    pub gold_reserve: u64,

    /// Scroll names per grade for upgrades
    #[serde(rename = "upgrade-scrolls")]
    pub upgrade_scrolls: [String; 2],

    /// Scroll names per grade for compounds
    #[serde(rename = "compound-scrolls")]
    pub compound_scrolls: [String; 2],

    /// Interval of the background checks, in seconds
    #[serde(rename = "check-interval-secs")]
    pub check_interval_secs: u64,

    pub supplies: Vec<SupplyTarget>,

    /// Peers the merchant supplies
    pub peers: Vec<String>,

    /// Gold a peer keeps when handing its loot over
    #[serde(rename = "peer-gold-reserve")]
    pub peer_gold_reserve: u64,

    /// Inventory slots left free for scrolls while withdrawing work items
    #[serde(rename = "reserved-slots")]
    pub reserved_slots: usize,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            market: Destination::map("market"),
            keep: vec!["hpot0".to_string(), "mpot0".to_string(), "stand0".to_string()],
            gold_reserve: 2_000_000,
            upgrade_scrolls: ["scroll0".to_string(), "scroll1".to_string()],
            compound_scrolls: ["cscroll0".to_string(), "cscroll1".to_string()],
            check_interval_secs: 30,
            supplies: vec![SupplyTarget::new("hpot0", 500, 100), SupplyTarget::new("mpot0", 800, 100)],
            peers: Vec::new(),
            peer_gold_reserve: 1_000_000,
            reserved_slots: 2,
        }
    }
}

impl MerchantConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn keeps(&self, item: &str) -> bool {
        self.keep.iter().any(|k| k == item)
    }

    /// Names of the items supplied to peers
    pub fn supply_items(&self) -> Vec<String> {
        self.supplies.iter().map(|s| s.item.clone()).collect()
    }
}
