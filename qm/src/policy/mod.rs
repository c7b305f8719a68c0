//! Item policies and the plans derived from them

mod catalog;
mod planner;

pub(crate) use catalog::default_catalog;
pub use catalog::{CompoundPolicy, ItemCatalog, ItemPolicy, UpgradePolicy, VendorPolicy};
pub use planner::{CompoundPlan, UpgradePlan, compound_plans, excess_copies, upgrade_plans};
