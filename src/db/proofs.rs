//! `Proof` repository (spec.md §3). Append-only.

use alloy_primitives::Address;
use sqlx::PgConnection;

use crate::types::ProofKind;

pub struct NewProof {
    pub shipment_no: i64,
    pub kind: ProofKind,
    pub signer: Address,
    pub claimed_ts: i64,
    pub distance_meters: Option<i64>,
    pub within_radius: bool,
}

pub async fn insert(conn: &mut PgConnection, new: &NewProof) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO proofs (shipment_no, kind, signer, claimed_ts, distance_meters, within_radius)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(new.shipment_no)
    .bind(new.kind)
    .bind(new.signer.to_string())
    .bind(new.claimed_ts)
    .bind(new.distance_meters)
    .bind(new.within_radius)
    .execute(conn)
    .await?;
    Ok(())
}
