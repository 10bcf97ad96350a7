//! Buyer product rows touched by inventory replenishment (spec.md §4.8).

use alloy_primitives::Address;
use sqlx::PgConnection;

/// Upserts the buyer's product row, incrementing `target_stock` by
/// `qty_increment` and setting `active = true`. Missing rows are created with
/// `min_threshold = 0`, `unit = "unit"`, `name = sku_id` — exactly the
/// defaults spec.md §4.8 requires.
pub async fn upsert_increment_stock(
    conn: &mut PgConnection,
    owner: Address,
    sku_id: &str,
    qty_increment: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO products (owner, sku_id, name, target_stock, min_threshold, unit, active)
        VALUES ($1, $2, $2, $3, 0, 'unit', true)
        ON CONFLICT (owner, sku_id) DO UPDATE
        SET target_stock = products.target_stock + EXCLUDED.target_stock,
            active = true
        "#,
    )
    .bind(owner.to_string())
    .bind(sku_id)
    .bind(qty_increment)
    .execute(conn)
    .await?;
    Ok(())
}
