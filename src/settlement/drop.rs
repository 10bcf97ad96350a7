//! Drop settlement (spec.md §4.6 "Drop settlement" steps 1-5): recomputes the
//! planned distance, submits `confirmDrop` on-chain, and — only once that
//! lands — commits the shipment/order/payment/product transitions.

use alloy_primitives::{Address, B256, U256};
use chrono::Utc;
use sqlx::PgConnection;

use crate::attestation::{self, DropApprovalMessage};
use crate::chain::ChainGateway;
use crate::db::models::{OrderRow, ShipmentRow, SigningSessionRow};
use crate::db::{orders, payments, proofs, shipments};
use crate::error::PodxError;
use crate::geo::geodesic_distance_meters;
use crate::inventory;
use crate::metadata::{DropMetadata, Metadata, MetadataEntry, OnchainMetadata};
use crate::state_machine;
use crate::types::{LineItem, OrderStatus, ProofKind};

pub async fn settle(
    conn: &mut PgConnection,
    gateway: &ChainGateway,
    session: &SigningSessionRow,
    shipment: &ShipmentRow,
    order: &OrderRow,
    counterparty_signature: &[u8],
    reward_per_meter: u64,
) -> Result<(B256, U256), PodxError> {
    let message: DropApprovalMessage = serde_json::from_value(session.payload.0["message"].clone())
        .map_err(|e| PodxError::Internal(format!("malformed session payload: {e}")))?;
    let claimed_ts: u64 = message.claimed_ts.parse().map_err(|_| PodxError::Internal("malformed claimedTs".into()))?;
    let distance_meters: u64 = message
        .distance_meters
        .parse()
        .map_err(|_| PodxError::Internal("malformed distanceMeters".into()))?;

    let planned = geodesic_distance_meters(shipment.pickup_lat, shipment.pickup_lon, shipment.drop_lat, shipment.drop_lon);
    state_machine::assert_distance_matches(distance_meters, planned, 5)?;

    let approval = attestation::rebuild_drop_attestation(&message).map_err(PodxError::Internal)?;
    let line_items = line_items_json(order);

    // Escrow still holds the full order amount at this point; read it before
    // `confirm_drop` releases it, or the cap below would clobber the reward
    // down to whatever dust `confirmDrop` left behind (spec.md §4.6 step 4).
    let escrowed_before = gateway
        .escrowed_balance(order.chain_order_id.0 .0)
        .await
        .map_err(|e| PodxError::ChainFailed(e.to_string()))?;

    let (tx_hash, reward_from_chain) = gateway
        .confirm_drop(
            (&approval).into(),
            &session.courier_signature,
            counterparty_signature,
            line_items.clone(),
            String::new(),
        )
        .await
        .map_err(|e| PodxError::ChainFailed(e.to_string()))?;

    let supplier_amount = decimal_to_u256(order.total_amount);
    let escrow_cap = escrowed_before.saturating_sub(supplier_amount);
    let distance_cap = U256::from(distance_meters.saturating_mul(reward_per_meter));
    // spec.md §8: courierReward <= escrowedBalance - supplierAmount, and
    // courierReward <= distanceMeters * rewardPerMeter, regardless of
    // whether the reward came off-chain or from the fallback formula.
    let courier_reward = reward_from_chain.unwrap_or(distance_cap).min(distance_cap).min(escrow_cap);

    let now = Utc::now();
    proofs::insert(
        conn,
        &proofs::NewProof {
            shipment_no: shipment.shipment_no,
            kind: ProofKind::DropCountersign,
            signer: session.counterparty.0,
            claimed_ts: claimed_ts as i64,
            distance_meters: Some(distance_meters as i64),
            within_radius: true,
        },
    )
    .await?;

    shipments::mark_delivered(conn, &shipment.id, now).await?;
    shipments::merge_metadata(
        conn,
        &shipment.id,
        &Metadata::single(
            "drop",
            MetadataEntry::Drop(DropMetadata {
                drop_tx_hash: Some(tx_hash.to_string()),
                courier_reward_wei: Some(courier_reward.to_string()),
            }),
        ),
    )
    .await?;

    orders::mark_delivered(conn, &order.id, now).await?;
    orders::merge_metadata(
        conn,
        &order.id,
        &Metadata::single(
            "onchain",
            MetadataEntry::Onchain(OnchainMetadata {
                drop_tx_hash: Some(tx_hash.to_string()),
                escrow_release_tx: Some(tx_hash.to_string()),
                ..Default::default()
            }),
        ),
    )
    .await?;

    let buyer: Address = order.buyer.0;
    let supplier: Address = order.supplier.0;
    let courier: Address = session.courier.0;
    payments::upsert_pending(conn, &order.id, buyer, supplier, order.total_amount).await?;
    payments::mark_released(conn, &order.id, buyer, supplier, &tx_hash.to_string()).await?;
    if !courier_reward.is_zero() {
        let courier_amount = rust_decimal::Decimal::from_str_exact(&courier_reward.to_string()).unwrap_or_default();
        payments::upsert_pending(conn, &order.id, buyer, courier, courier_amount).await?;
        payments::mark_released(conn, &order.id, buyer, courier, &tx_hash.to_string()).await?;
    }

    inventory::replenish(conn, buyer, &order_line_items(order)).await?;

    Ok((tx_hash, courier_reward))
}

/// `total_amount` is always a whole number of token base units; the
/// fractional part (if any slipped in) is truncated rather than rejected,
/// since this only feeds a cap and never a transfer amount itself.
fn decimal_to_u256(amount: rust_decimal::Decimal) -> U256 {
    U256::from_str_radix(&amount.trunc().to_string(), 10).unwrap_or(U256::ZERO)
}

fn order_line_items(order: &OrderRow) -> Vec<LineItem> {
    match order.metadata.0.get("items") {
        Some(MetadataEntry::Items(items)) => items
            .line_items_json
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<LineItem>>(raw).ok())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn line_items_json(order: &OrderRow) -> String {
    match order.metadata.0.get("items") {
        Some(MetadataEntry::Items(items)) => items.line_items_json.clone().unwrap_or_else(|| "[]".to_string()),
        _ => "[]".to_string(),
    }
}
