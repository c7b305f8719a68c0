//! Upgrade and compound planning over the ledger

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::ItemCatalog;
use crate::bank::Ledger;
use crate::domain::Position;

/// Copies of one item to raise to a target level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradePlan {
    pub name: String,
    pub target_level: u32,
    pub positions: Vec<Position>,
}

/// Three copies of one item at one level to combine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompoundPlan {
    pub name: String,
    pub level: u32,
    pub positions: [Position; 3],
}

/// Copies of `name` in the bank, highest level first
fn ranked_copies(ledger: &Ledger, name: &str) -> Vec<(Position, u32)> {
    let mut copies: Vec<(Position, u32)> = ledger
        .positions_of(name, |_| true)
        .into_iter()
        .filter_map(|position| {
            let level = ledger.item_at(&position)?.level();
            Some((position, level))
        })
        .collect();
    copies.sort_by(|(pa, la), (pb, lb)| lb.cmp(la).then_with(|| pa.cmp(pb)));
    copies
}

/// Copies beyond the kept ones that may be consumed, highest level first
///
/// The cut starts at `keep`, or earlier at the first base-level copy unless
/// `allow_base_level` is set. Copies already at `max` or above are never
/// consumed.
pub fn excess_copies(ledger: &Ledger, name: &str, keep: usize, max: u32, allow_base_level: bool) -> Vec<(Position, u32)> {
    let copies = ranked_copies(ledger, name);
    let start = if allow_base_level {
        keep
    } else {
        let first_base = copies.iter().position(|(_, level)| *level == 0).unwrap_or(copies.len());
        keep.min(first_base)
    };
    copies
        .into_iter()
        .skip(start)
        .filter(|(_, level)| *level < max)
        .collect()
}

/// Upgrade work for every upgradeable item with more copies than it keeps
///
/// Only copies a scroll grade can still raise are ranked.
pub fn upgrade_plans(ledger: &Ledger, catalog: &ItemCatalog) -> Vec<UpgradePlan> {
    let mut plans = Vec::new();
    for (name, policy) in catalog.iter() {
        let Some(upgrade) = policy.upgrade else {
            continue;
        };
        let copies: Vec<(Position, u32)> = ranked_copies(ledger, name)
            .into_iter()
            .filter(|(_, level)| policy.grade(*level).is_some())
            .collect();
        if copies.len() <= upgrade.keep {
            continue;
        }
        let target_level = match upgrade.keep {
            0 => upgrade.max,
            keep => upgrade.max.min(copies[keep - 1].1 + 1),
        };
        let positions: Vec<Position> = copies[upgrade.keep..]
            .iter()
            .filter(|(_, level)| *level < target_level)
            .map(|(position, _)| position.clone())
            .collect();
        if positions.is_empty() {
            continue;
        }
        debug!(%name, %target_level, copies = %positions.len(), "upgrade_plans: planned");
        plans.push(UpgradePlan {
            name: name.to_string(),
            target_level,
            positions,
        });
    }
    plans
}

/// Triples of same-level excess copies for every compoundable item
pub fn compound_plans(ledger: &Ledger, catalog: &ItemCatalog) -> Vec<CompoundPlan> {
    let mut plans = Vec::new();
    for (name, policy) in catalog.iter() {
        let Some(compound) = policy.compound else {
            continue;
        };
        let mut by_level: BTreeMap<u32, Vec<Position>> = BTreeMap::new();
        for (position, level) in excess_copies(ledger, name, compound.keep, compound.max, compound.allow_base_level) {
            by_level.entry(level).or_default().push(position);
        }
        for (level, positions) in by_level {
            for triple in positions.chunks_exact(3) {
                plans.push(CompoundPlan {
                    name: name.to_string(),
                    level,
                    positions: [triple[0].clone(), triple[1].clone(), triple[2].clone()],
                });
            }
        }
    }
    debug!(plans = %plans.len(), "compound_plans: planned");
    plans
}
