//! `SigningSession` repository (spec.md §3, §4.4).

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::models::SigningSessionRow;
use crate::types::{ChainOrderId, SessionKind, SessionStatus};

pub struct NewSession {
    pub session_uid: Uuid,
    pub shipment_id: String,
    pub kind: SessionKind,
    pub courier: Address,
    pub counterparty: Address,
    pub chain_order_id: ChainOrderId,
    pub deadline: DateTime<Utc>,
    pub status: SessionStatus,
    pub courier_nonce: Uuid,
    pub context_hash: Vec<u8>,
    pub courier_signature: Vec<u8>,
    pub payload: serde_json::Value,
}

/// Inserts a session. Fails with a unique-violation when a non-terminal
/// session already exists for `(shipment_id, kind)` — the caller maps that
/// into [`crate::error::PodxError::SessionConflict`].
pub async fn insert(conn: &mut PgConnection, new: &NewSession) -> Result<SigningSessionRow, sqlx::Error> {
    sqlx::query_as::<_, SigningSessionRow>(
        r#"
        INSERT INTO signing_sessions
            (session_uid, shipment_id, kind, courier, counterparty, chain_order_id,
             deadline, status, courier_nonce, context_hash, courier_signature, payload)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(new.session_uid)
    .bind(&new.shipment_id)
    .bind(new.kind)
    .bind(new.courier.to_string())
    .bind(new.counterparty.to_string())
    .bind(new.chain_order_id.to_string())
    .bind(new.deadline)
    .bind(new.status)
    .bind(new.courier_nonce)
    .bind(&new.context_hash)
    .bind(&new.courier_signature)
    .bind(sqlx::types::Json(&new.payload))
    .fetch_one(conn)
    .await
}

pub async fn find_by_uid(pool: &PgPool, session_uid: Uuid) -> Result<Option<SigningSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, SigningSessionRow>("SELECT * FROM signing_sessions WHERE session_uid = $1")
        .bind(session_uid)
        .fetch_optional(pool)
        .await
}

/// Locks the session row for update within an existing transaction, so a
/// `resolveSession`/`completeSession` call serialises against concurrent
/// attempts on the same `sessionUid` (spec.md §5).
pub async fn lock_for_update(conn: &mut PgConnection, session_uid: Uuid) -> Result<Option<SigningSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, SigningSessionRow>("SELECT * FROM signing_sessions WHERE session_uid = $1 FOR UPDATE")
        .bind(session_uid)
        .fetch_optional(conn)
        .await
}

pub async fn mark_completed(
    conn: &mut PgConnection,
    session_uid: Uuid,
    counterparty_signature: &[u8],
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE signing_sessions SET status = 'completed', counterparty_signature = $2 WHERE session_uid = $1")
        .bind(session_uid)
        .bind(counterparty_signature)
        .execute(conn)
        .await?;
    Ok(())
}

/// Lists every session still awaiting a countersignature, for the recovery
/// sweep to check against on-chain state (spec.md §4.6 "Commit ordering and
/// recovery").
pub async fn list_pending(pool: &PgPool) -> Result<Vec<SigningSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, SigningSessionRow>(
        "SELECT * FROM signing_sessions WHERE status IN ('pending_supplier', 'pending_buyer')",
    )
    .fetch_all(pool)
    .await
}

/// Flips every non-terminal session whose deadline has passed to `EXPIRED`,
/// returning the affected `session_uid`s so callers can invalidate their
/// magic links (spec.md §4.4 `expire()`).
pub async fn expire_past_deadline(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE signing_sessions
        SET status = 'expired'
        WHERE deadline < $1 AND status IN ('pending_supplier', 'pending_buyer')
        RETURNING session_uid
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(uid,)| uid).collect())
}
