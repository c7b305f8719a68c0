//! Per-item policy catalog

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How many copies of an upgradeable item to keep and how far to take them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePolicy {
    pub keep: usize,
    pub max: u32,
}

/// How many copies of a compoundable item to keep and how far to take them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundPolicy {
    pub keep: usize,
    pub max: u32,

    /// Also consume base-level copies that rank above the keep cut
    #[serde(rename = "allow-base-level", default)]
    pub allow_base_level: bool,
}

/// Whether surplus copies go to a vendor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorPolicy {
    pub sell: bool,

    /// Copies (bank plus inventory) never sold
    pub keep: u32,
}

/// Everything the merchant knows about one item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPolicy {
    /// Maximum stack quantity; `None` for non-stackable items
    #[serde(rename = "stack-size", skip_serializing_if = "Option::is_none")]
    pub stack_size: Option<u32>,

    /// Vendor price per unit
    pub price: u64,

    /// Level boundaries between scroll grades: below `grades[0]` uses grade 0,
    /// below `grades[1]` uses grade 1, otherwise the item cannot be raised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grades: Option<[u32; 2]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<UpgradePolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compound: Option<CompoundPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<VendorPolicy>,
}

impl ItemPolicy {
    pub fn stackable(stack_size: u32, price: u64) -> Self {
        Self {
            stack_size: Some(stack_size),
            price,
            ..Default::default()
        }
    }

    /// Scroll grade needed to raise an item from `level`
    pub fn grade(&self, level: u32) -> Option<usize> {
        let [first, second] = self.grades?;
        if level < first {
            Some(0)
        } else if level < second {
            Some(1)
        } else {
            None
        }
    }
}

/// Item policies keyed by item name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCatalog {
    items: BTreeMap<String, ItemPolicy>,
}

impl ItemCatalog {
    pub fn with(mut self, name: impl Into<String>, policy: ItemPolicy) -> Self {
        self.items.insert(name.into(), policy);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, policy: ItemPolicy) {
        self.items.insert(name.into(), policy);
    }

    pub fn get(&self, name: &str) -> Option<&ItemPolicy> {
        self.items.get(name)
    }

    pub fn stack_size(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(|p| p.stack_size)
    }

    pub fn price(&self, name: &str) -> u64 {
        self.get(name).map(|p| p.price).unwrap_or(0)
    }

    pub fn grade(&self, name: &str, level: u32) -> Option<usize> {
        self.get(name).and_then(|p| p.grade(level))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemPolicy)> {
        self.items.iter().map(|(name, policy)| (name.as_str(), policy))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Catalog shipped with the default configuration
pub(crate) fn default_catalog() -> ItemCatalog {
    let gear_upgrade = ItemPolicy {
        price: 24_000,
        grades: Some([7, 9]),
        upgrade: Some(UpgradePolicy { keep: 1, max: 8 }),
        ..Default::default()
    };
    let jewelry_compound = ItemPolicy {
        price: 6_000,
        grades: Some([2, 4]),
        compound: Some(CompoundPolicy {
            keep: 2,
            max: 3,
            allow_base_level: false,
        }),
        ..Default::default()
    };

    ItemCatalog::default()
        .with("hpot0", ItemPolicy::stackable(9999, 20))
        .with("mpot0", ItemPolicy::stackable(9999, 20))
        .with("scroll0", ItemPolicy::stackable(9999, 1_000))
        .with("scroll1", ItemPolicy::stackable(9999, 40_000))
        .with("cscroll0", ItemPolicy::stackable(9999, 6_400))
        .with("cscroll1", ItemPolicy::stackable(9999, 240_000))
        .with("helmet", gear_upgrade.clone())
        .with("shoes", gear_upgrade)
        .with("ringsj", jewelry_compound)
        .with(
            "hpamulet",
            ItemPolicy {
                price: 2_400,
                vendor: Some(VendorPolicy { sell: true, keep: 0 }),
                ..Default::default()
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        let policy = ItemPolicy {
            grades: Some([7, 9]),
            ..Default::default()
        };
        assert_eq!(policy.grade(0), Some(0));
        assert_eq!(policy.grade(6), Some(0));
        assert_eq!(policy.grade(7), Some(1));
        assert_eq!(policy.grade(8), Some(1));
        assert_eq!(policy.grade(9), None);
        assert_eq!(ItemPolicy::default().grade(0), None);
    }

    #[test]
    fn test_catalog_yaml() {
        let yaml = r#"
hpot0:
  stack-size: 9999
  price: 20
ringsj:
  price: 6000
  grades: [2, 4]
  compound:
    keep: 3
    max: 4
"#;
        let catalog: ItemCatalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.stack_size("hpot0"), Some(9999));
        assert_eq!(catalog.stack_size("ringsj"), None);
        assert_eq!(catalog.grade("ringsj", 3), Some(1));

        let compound = catalog.get("ringsj").and_then(|p| p.compound).unwrap();
        assert_eq!(compound.keep, 3);
        assert!(!compound.allow_base_level);
    }

    #[test]
    fn test_default_catalog_has_supplies() {
        let catalog = default_catalog();
        assert_eq!(catalog.stack_size("hpot0"), Some(9999));
        assert!(catalog.get("helmet").and_then(|p| p.upgrade).is_some());
        assert_eq!(catalog.price("unknown"), 0);
    }
}
