//! Pickup settlement (spec.md §4.6 "Pickup settlement" steps 1-2): submits
//! `confirmPickup` on-chain, then — only once that lands — commits the
//! shipment/order transition in the same row-locked transaction.

use alloy_primitives::B256;
use chrono::Utc;
use sqlx::PgConnection;

use crate::attestation::{self, PickupApprovalMessage};
use crate::chain::ChainGateway;
use crate::db::models::{OrderRow, ShipmentRow, SigningSessionRow};
use crate::db::{orders, proofs, shipments};
use crate::error::PodxError;
use crate::metadata::{Metadata, MetadataEntry, OnchainMetadata, PickupMetadata};
use crate::types::{OrderStatus, ProofKind};

pub async fn settle(
    conn: &mut PgConnection,
    gateway: &ChainGateway,
    session: &SigningSessionRow,
    shipment: &ShipmentRow,
    order: &OrderRow,
    counterparty_signature: &[u8],
) -> Result<B256, PodxError> {
    let message: PickupApprovalMessage = serde_json::from_value(session.payload.0["message"].clone())
        .map_err(|e| PodxError::Internal(format!("malformed session payload: {e}")))?;
    let claimed_ts: u64 = message.claimed_ts.parse().map_err(|_| PodxError::Internal("malformed claimedTs".into()))?;
    let approval = attestation::rebuild_pickup_attestation(&message).map_err(PodxError::Internal)?;

    let tx_hash = gateway
        .confirm_pickup((&approval).into(), &session.courier_signature, counterparty_signature)
        .await
        .map_err(|e| PodxError::ChainFailed(e.to_string()))?;

    let now = Utc::now();
    proofs::insert(
        conn,
        &proofs::NewProof {
            shipment_no: shipment.shipment_no,
            kind: ProofKind::PickupCountersign,
            signer: session.counterparty.0,
            claimed_ts: claimed_ts as i64,
            distance_meters: None,
            within_radius: true,
        },
    )
    .await?;

    shipments::mark_in_transit(conn, &shipment.id, now, session.courier.0).await?;
    shipments::merge_metadata(
        conn,
        &shipment.id,
        &Metadata::single(
            "pickup",
            MetadataEntry::Pickup(PickupMetadata {
                pickup_tx_hash: Some(tx_hash.to_string()),
            }),
        ),
    )
    .await?;

    orders::set_status(conn, &order.id, OrderStatus::Shipped).await?;
    orders::merge_metadata(
        conn,
        &order.id,
        &Metadata::single(
            "onchain",
            MetadataEntry::Onchain(OnchainMetadata {
                pickup_tx_hash: Some(tx_hash.to_string()),
                ..Default::default()
            }),
        ),
    )
    .await?;

    Ok(tx_hash)
}
