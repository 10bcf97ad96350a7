//! Buyer stock replenishment (spec.md §4.8): on drop settlement, every line
//! item on the order increments the buyer's `target_stock` for that SKU.
//! The row-level upsert lives in [`crate::db::products`]; this module is the
//! call site `settlement::drop` goes through so the policy — one increment
//! per line item, applied within the settlement transaction — has a home
//! distinct from the raw repository.

use alloy_primitives::Address;
use sqlx::PgConnection;

use crate::db::products;
use crate::types::LineItem;

/// Applies every line item's quantity as a stock increment for `owner`.
pub async fn replenish(conn: &mut PgConnection, owner: Address, line_items: &[LineItem]) -> Result<(), sqlx::Error> {
    for item in line_items {
        products::upsert_increment_stock(conn, owner, &item.sku_id, item.qty).await?;
    }
    Ok(())
}
