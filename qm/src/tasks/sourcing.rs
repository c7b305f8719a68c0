//! Getting items into the inventory: bank first, then the market

use eyre::{Result, bail};
use tracing::{debug, info, warn};

use super::Session;

/// Sync the ledger unless it already holds current data
pub async fn ensure_bank_data(session: &Session) -> Result<()> {
    let mut ledger = session.ledger.lock().await;
    if ledger.has_data() {
        return Ok(());
    }
    debug!("ensure_bank_data: syncing");
    if !ledger.sync(session.actor.as_ref()).await? {
        bail!("Bank contents unavailable");
    }
    Ok(())
}

/// Move to the market unless already there
pub(super) async fn move_to_market(session: &Session) -> Result<()> {
    let market = &session.merchant.market;
    if market.map_name() == Some(session.actor.map().as_str()) {
        return Ok(());
    }
    session.actor.move_to(market).await?;
    Ok(())
}

/// Get `wanted` of an item into the inventory
///
/// Counts what is already carried, withdraws the rest from the bank, and
/// buys whatever the bank could not cover as far as gold allows. Returns the
/// quantity carried afterwards, which may fall short of `wanted`.
pub async fn gather(session: &Session, item: &str, wanted: u32) -> Result<u32> {
    debug!(%item, %wanted, "gather: called");
    let actor = session.actor.as_ref();
    let held = actor.inventory().quantity_of(item);
    if held >= wanted {
        return Ok(held);
    }

    {
        let mut ledger = session.ledger.lock().await;
        if ledger.has_data() && ledger.total(item) > 0 {
            let withdrawn = ledger.withdraw_named(actor, item, wanted - held).await?;
            debug!(%item, stacks = %withdrawn.len(), "gather: withdrew from bank");
        }
    }

    let held = actor.inventory().quantity_of(item);
    if held >= wanted {
        return Ok(held);
    }
    let bought = buy(session, item, wanted - held).await?;
    let held = actor.inventory().quantity_of(item);
    info!(%item, %held, %bought, "Gathered");
    Ok(held)
}

/// Buy up to `quantity` at the market, limited by gold and stack size
async fn buy(session: &Session, item: &str, quantity: u32) -> Result<u32> {
    let actor = session.actor.as_ref();
    let price = session.catalog.price(item);
    let affordable = match price {
        0 => quantity,
        price => u32::try_from(actor.gold() / price).unwrap_or(u32::MAX).min(quantity),
    };
    if affordable == 0 {
        warn!(%item, %quantity, gold = %actor.gold(), "Cannot afford any");
        return Ok(0);
    }

    move_to_market(session).await?;
    let chunk = session.catalog.stack_size(item).unwrap_or(1).max(1);
    let mut bought = 0;
    while bought < affordable {
        let batch = chunk.min(affordable - bought);
        actor.buy(item, batch).await?;
        bought += batch;
    }
    debug!(%item, %bought, "buy: done");
    Ok(bought)
}
