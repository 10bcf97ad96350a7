//! `MagicLink` repository (spec.md §3, §4.5).

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::MagicLinkRow;
use crate::types::CounterpartyRole;

pub struct NewMagicLink {
    pub token_hash: [u8; 32],
    pub role: CounterpartyRole,
    pub jti: [u8; 12],
    pub expires_at: DateTime<Utc>,
    pub session_uid: Uuid,
}

pub async fn insert(conn: &mut PgConnection, new: &NewMagicLink) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO magic_links (token_hash, role, jti, expires_at, session_uid) VALUES ($1, $2, $3, $4, $5)")
        .bind(new.token_hash.as_slice())
        .bind(new.role)
        .bind(new.jti.as_slice())
        .bind(new.expires_at)
        .bind(new.session_uid)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn find_by_token_hash(conn: &mut PgConnection, token_hash: &[u8]) -> Result<Option<MagicLinkRow>, sqlx::Error> {
    sqlx::query_as::<_, MagicLinkRow>("SELECT * FROM magic_links WHERE token_hash = $1")
        .bind(token_hash)
        .fetch_optional(conn)
        .await
}

/// Marks the link used, returning the number of affected rows. A conditional
/// `used_at IS NULL` guard makes this the single source of truth for
/// single-use enforcement (spec.md §5): a replayed call returns `0`.
pub async fn mark_used(conn: &mut PgConnection, token_hash: &[u8], now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE magic_links SET used_at = $2 WHERE token_hash = $1 AND used_at IS NULL")
        .bind(token_hash)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn invalidate_for_sessions(conn: &mut PgConnection, session_uids: &[Uuid], now: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE magic_links SET used_at = $2 WHERE session_uid = ANY($1) AND used_at IS NULL")
        .bind(session_uids)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}
