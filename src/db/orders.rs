//! `Order` repository (spec.md §3).

use sqlx::PgConnection;

use crate::db::models::OrderRow;
use crate::metadata::Metadata;
use crate::types::OrderStatus;

pub async fn find_by_id(conn: &mut PgConnection, order_id: &str) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await
}

pub async fn lock_for_update(conn: &mut PgConnection, order_id: &str) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(conn)
        .await
}

pub async fn set_status(conn: &mut PgConnection, order_id: &str, status: OrderStatus) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
        .bind(order_id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}

/// Shallow-merges a typed [`Metadata`] patch into the order's `metadata`
/// column via JSONB `||` (spec.md §9 "Dynamic metadata blobs"); see
/// [`crate::db::shipments::merge_metadata`] for why this stays shallow
/// rather than replacing the whole column.
pub async fn merge_metadata(conn: &mut PgConnection, order_id: &str, patch: &Metadata) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET metadata = metadata || $2 WHERE id = $1")
        .bind(order_id)
        .bind(sqlx::types::Json(patch))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn mark_delivered(conn: &mut PgConnection, order_id: &str, completed_at: chrono::DateTime<chrono::Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = 'delivered', completed_at = $2 WHERE id = $1")
        .bind(order_id)
        .bind(completed_at)
        .execute(conn)
        .await?;
    Ok(())
}
