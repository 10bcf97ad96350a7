//! `Payment` repository (spec.md §3). At most one row per `(orderId, payer, payee)`.

use alloy_primitives::Address;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::db::models::PaymentRow;

pub async fn find(conn: &mut PgConnection, order_id: &str, payer: Address, payee: Address) -> Result<Option<PaymentRow>, sqlx::Error> {
    sqlx::query_as::<_, PaymentRow>("SELECT * FROM payments WHERE order_id = $1 AND payer = $2 AND payee = $3")
        .bind(order_id)
        .bind(payer.to_string())
        .bind(payee.to_string())
        .fetch_optional(conn)
        .await
}

/// Upserts the escrow row for an order, used when a payment hasn't been
/// recorded yet by the time settlement needs to transition it.
pub async fn upsert_pending(
    conn: &mut PgConnection,
    order_id: &str,
    payer: Address,
    payee: Address,
    amount: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO payments (order_id, payer, payee, amount, status)
        VALUES ($1, $2, $3, $4, 'pending')
        ON CONFLICT (order_id, payer, payee) DO NOTHING
        "#,
    )
    .bind(order_id)
    .bind(payer.to_string())
    .bind(payee.to_string())
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_released(
    conn: &mut PgConnection,
    order_id: &str,
    payer: Address,
    payee: Address,
    release_tx: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE payments
        SET status = 'released', release_tx = $4
        WHERE order_id = $1 AND payer = $2 AND payee = $3
        "#,
    )
    .bind(order_id)
    .bind(payer.to_string())
    .bind(payee.to_string())
    .bind(release_tx)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_escrow_tx(
    conn: &mut PgConnection,
    order_id: &str,
    payer: Address,
    payee: Address,
    escrow_tx: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE payments
        SET status = 'escrowed', escrow_tx = $4
        WHERE order_id = $1 AND payer = $2 AND payee = $3
        "#,
    )
    .bind(order_id)
    .bind(payer.to_string())
    .bind(payee.to_string())
    .bind(escrow_tx)
    .execute(conn)
    .await?;
    Ok(())
}
