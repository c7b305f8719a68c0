//! Post-task inventory cleanup

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::Session;
use super::sourcing::{ensure_bank_data, move_to_market};

/// What a cleanup pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Item name and quantity sold
    pub sold: Vec<(String, u32)>,
    pub stored: usize,
    pub unstored: usize,
    pub gold_deposited: u64,
}

/// Sell vendor surplus, store everything not kept, bank gold above the reserve
///
/// Surplus counts bank and inventory together against the vendor policy's
/// kept count. Items on the merchant keep list are never touched.
pub async fn clean_inventory(session: &Session) -> eyre::Result<CleanReport> {
    debug!("clean_inventory: called");
    let actor = session.actor.as_ref();
    let merchant = &session.merchant;
    let mut report = CleanReport::default();
    ensure_bank_data(session).await?;

    let mut sales = Vec::new();
    {
        let ledger = session.ledger.lock().await;
        let inventory = actor.inventory();
        let mut surplus: BTreeMap<String, u32> = BTreeMap::new();
        for (slot, item) in inventory.occupied() {
            if merchant.keeps(&item.name) {
                continue;
            }
            let Some(vendor) = session.catalog.get(&item.name).and_then(|p| p.vendor) else {
                continue;
            };
            if !vendor.sell {
                continue;
            }
            let remaining = surplus.entry(item.name.clone()).or_insert_with(|| {
                let total = ledger.total(&item.name) + inventory.quantity_of(&item.name);
                total.saturating_sub(vendor.keep)
            });
            let quantity = item.quantity().min(*remaining);
            if quantity > 0 {
                *remaining -= quantity;
                sales.push((slot, item.name.clone(), quantity));
            }
        }
    }

    if !sales.is_empty() {
        move_to_market(session).await?;
        for (slot, name, quantity) in sales {
            actor.sell(slot, quantity).await?;
            debug!(%slot, item = %name, %quantity, "clean_inventory: sold");
            report.sold.push((name, quantity));
        }
    }

    let slots: Vec<usize> = actor
        .inventory()
        .occupied()
        .filter(|(_, item)| !merchant.keeps(&item.name))
        .map(|(slot, _)| slot)
        .collect();

    let mut ledger = session.ledger.lock().await;
    if !slots.is_empty() {
        let stored = ledger.store(actor, &slots, &session.catalog).await?;
        report.stored = stored.stored_count();
        report.unstored = stored.unstored.len();
    }

    let held = actor.gold();
    if held > merchant.gold_reserve {
        report.gold_deposited = ledger.deposit_gold(actor, held - merchant.gold_reserve).await?;
    }

    info!(
        sold = %report.sold.len(),
        stored = %report.stored,
        unstored = %report.unstored,
        gold = %report.gold_deposited,
        "Inventory cleaned"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, SimActor};
    use crate::bank::{BankConfig, Ledger};
    use crate::domain::{BankSnapshot, StoredItem};
    use crate::policy::{ItemCatalog, ItemPolicy, VendorPolicy};
    use crate::tasks::MerchantConfig;
    use std::sync::Arc;

    fn catalog() -> ItemCatalog {
        ItemCatalog::default()
            .with("hpot0", ItemPolicy::stackable(9999, 20))
            .with("seashell", ItemPolicy::stackable(9999, 5))
            .with(
                "hpamulet",
                ItemPolicy {
                    price: 100,
                    vendor: Some(VendorPolicy { sell: true, keep: 1 }),
                    ..Default::default()
                },
            )
    }

    #[tokio::test]
    async fn test_clean_sells_stores_and_banks_gold() {
        let bank = BankSnapshot::default().with_container(
            "items0",
            vec![Some(StoredItem::new("hpamulet")), Some(StoredItem::stack("seashell", 10)), None, None],
        );
        let actor = Arc::new(
            SimActor::new("merchant", 8)
                .with_catalog(catalog())
                .with_bank(bank, 4)
                .with_gold(2_500)
                .with_item(0, StoredItem::stack("hpot0", 200))
                .with_item(1, StoredItem::new("hpamulet"))
                .with_item(2, StoredItem::new("hpamulet"))
                .with_item(3, StoredItem::stack("seashell", 5)),
        );
        let merchant = MerchantConfig {
            gold_reserve: 1_000,
            ..Default::default()
        };
        let session = Session::new(actor.clone(), Ledger::new(BankConfig::default()), catalog(), merchant);

        let report = clean_inventory(&session).await.unwrap();

        // One amulet in the bank covers the kept count, so both carried ones go.
        assert_eq!(report.sold, vec![("hpamulet".to_string(), 1), ("hpamulet".to_string(), 1)]);
        assert_eq!(report.stored, 1);
        assert_eq!(report.unstored, 0);
        assert_eq!(report.gold_deposited, 2_500 + 200 - 1_000);

        let inventory = actor.inventory();
        assert_eq!(inventory.occupied_count(), 1);
        assert_eq!(inventory.quantity_of("hpot0"), 200);
        assert_eq!(actor.gold(), 1_000);

        let ledger = session.ledger.lock().await;
        assert_eq!(ledger.total("seashell"), 15);
        assert_eq!(ledger.total("hpamulet"), 1);
        assert_eq!(ledger.gold(), 1_700);
        assert_eq!(ledger.check_consistency(), Ok(()));
    }
}
