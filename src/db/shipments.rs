//! `Shipment` repository (spec.md §3).

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::db::models::ShipmentRow;
use crate::metadata::Metadata;

pub async fn find_by_id(conn: &mut PgConnection, shipment_id: &str) -> Result<Option<ShipmentRow>, sqlx::Error> {
    sqlx::query_as::<_, ShipmentRow>("SELECT * FROM shipments WHERE id = $1")
        .bind(shipment_id)
        .fetch_optional(conn)
        .await
}

pub async fn lock_for_update(conn: &mut PgConnection, shipment_id: &str) -> Result<Option<ShipmentRow>, sqlx::Error> {
    sqlx::query_as::<_, ShipmentRow>("SELECT * FROM shipments WHERE id = $1 FOR UPDATE")
        .bind(shipment_id)
        .fetch_optional(conn)
        .await
}

pub async fn mark_in_transit(
    conn: &mut PgConnection,
    shipment_id: &str,
    picked_up_at: DateTime<Utc>,
    courier: Address,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE shipments
        SET status = 'in_transit',
            picked_up_at = $2,
            assigned_courier = COALESCE(assigned_courier, $3)
        WHERE id = $1
        "#,
    )
    .bind(shipment_id)
    .bind(picked_up_at)
    .bind(courier.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_delivered(conn: &mut PgConnection, shipment_id: &str, delivered_at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE shipments SET status = 'delivered', delivered_at = $2 WHERE id = $1")
        .bind(shipment_id)
        .bind(delivered_at)
        .execute(conn)
        .await?;
    Ok(())
}

/// Shallow-merges a typed, single- (or few-) key [`Metadata`] patch into the
/// shipment's `metadata` column via JSONB `||`, leaving sibling keys alone —
/// e.g. the pickup settlement's `"pickup"` entry never disturbs a later
/// `"drop"` entry on the same row (spec.md §9 "Dynamic metadata blobs").
pub async fn merge_metadata(conn: &mut PgConnection, shipment_id: &str, patch: &Metadata) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE shipments SET metadata = metadata || $2 WHERE id = $1")
        .bind(shipment_id)
        .bind(sqlx::types::Json(patch))
        .execute(conn)
        .await?;
    Ok(())
}
