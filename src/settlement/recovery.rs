//! Reconciles sessions whose on-chain confirmation succeeded but whose
//! matching DB commit never landed — the gap spec.md §4.6 ("Commit ordering
//! and recovery") calls out between a successful `confirmPickup`/`confirmDrop`
//! and the relational transaction that was supposed to follow it. Catch-up is
//! idempotent on `(shipmentId, kind)`: a session already marked `COMPLETED`
//! is left untouched.

use std::sync::Arc;

use alloy_primitives::B256;
use chrono::Utc;
use sqlx::PgPool;

use crate::chain::ChainGateway;
use crate::crypto::eip712::shipment_id_hash;
use crate::db::models::SigningSessionRow;
use crate::db::{orders, proofs, sessions, shipments};
use crate::error::PodxError;
use crate::metadata::{DropMetadata, Metadata, MetadataEntry, OnchainMetadata, PickupMetadata};
use crate::types::{OrderStatus, ProofKind, SessionKind};

pub struct RecoveryPass {
    pool: PgPool,
    gateway: Arc<ChainGateway>,
}

impl RecoveryPass {
    pub fn new(pool: PgPool, gateway: Arc<ChainGateway>) -> Self {
        Self { pool, gateway }
    }

    /// Checks every session still awaiting a countersignature against the
    /// chain, catching up the DB for any whose milestone already landed.
    /// Run on a timer, and opportunistically before serving a stale
    /// `PENDING_*` session.
    pub async fn sweep(&self) -> Result<usize, PodxError> {
        let pending = sessions::list_pending(&self.pool).await?;
        let mut reconciled = 0;
        for session in pending {
            if self.reconcile(&session).await? {
                reconciled += 1;
            }
        }
        Ok(reconciled)
    }

    /// Reconciles a single session. Returns `true` if the DB was caught up.
    async fn reconcile(&self, session: &SigningSessionRow) -> Result<bool, PodxError> {
        let shipment_hash = shipment_id_hash(&session.shipment_id);
        match session.kind {
            SessionKind::Pickup => self.reconcile_pickup(session, shipment_hash).await,
            SessionKind::Drop => self.reconcile_drop(session, shipment_hash).await,
        }
    }

    async fn reconcile_pickup(&self, session: &SigningSessionRow, shipment_hash: B256) -> Result<bool, PodxError> {
        let Some((tx_hash, claimed_ts)) = self
            .gateway
            .find_pickup_approved(shipment_hash)
            .await
            .map_err(|e| PodxError::ChainFailed(e.to_string()))?
        else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await?;
        let Some(locked) = sessions::lock_for_update(&mut tx, session.session_uid).await? else {
            return Ok(false);
        };
        if locked.status != crate::types::SessionStatus::pending_for(SessionKind::Pickup) {
            return Ok(false);
        }
        let Some(shipment) = shipments::lock_for_update(&mut tx, &locked.shipment_id).await? else {
            return Ok(false);
        };
        if shipment.picked_up_at.is_some() {
            // Already caught up by a prior sweep or the original request after all.
            tx.commit().await?;
            return Ok(false);
        }

        let now = Utc::now();
        proofs::insert(
            &mut tx,
            &proofs::NewProof {
                shipment_no: shipment.shipment_no,
                kind: ProofKind::PickupCountersign,
                signer: locked.counterparty.0,
                claimed_ts: claimed_ts as i64,
                distance_meters: None,
                within_radius: true,
            },
        )
        .await?;
        shipments::mark_in_transit(&mut tx, &shipment.id, now, locked.courier.0).await?;
        shipments::merge_metadata(
            &mut tx,
            &shipment.id,
            &Metadata::single(
                "pickup",
                MetadataEntry::Pickup(PickupMetadata {
                    pickup_tx_hash: Some(tx_hash.to_string()),
                }),
            ),
        )
        .await?;
        orders::set_status(&mut tx, &shipment.order_id, OrderStatus::Shipped).await?;
        orders::merge_metadata(
            &mut tx,
            &shipment.order_id,
            &Metadata::single(
                "onchain",
                MetadataEntry::Onchain(OnchainMetadata {
                    pickup_tx_hash: Some(tx_hash.to_string()),
                    ..Default::default()
                }),
            ),
        )
        .await?;
        // The original counterparty signature only ever existed as an HTTP
        // request body; if the first attempt never reached `mark_completed`
        // it's gone, and the chain call it authorized is already final.
        sessions::mark_completed(&mut tx, locked.session_uid, &[]).await?;
        tx.commit().await?;

        tracing::warn!(shipment_id = %locked.shipment_id, tx = %tx_hash, "recovery pass caught up pickup settlement");
        Ok(true)
    }

    async fn reconcile_drop(&self, session: &SigningSessionRow, shipment_hash: B256) -> Result<bool, PodxError> {
        let Some((tx_hash, claimed_ts, courier_reward)) = self
            .gateway
            .find_drop_approved(shipment_hash)
            .await
            .map_err(|e| PodxError::ChainFailed(e.to_string()))?
        else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await?;
        let Some(locked) = sessions::lock_for_update(&mut tx, session.session_uid).await? else {
            return Ok(false);
        };
        if locked.status != crate::types::SessionStatus::pending_for(SessionKind::Drop) {
            return Ok(false);
        }
        let Some(shipment) = shipments::lock_for_update(&mut tx, &locked.shipment_id).await? else {
            return Ok(false);
        };
        if shipment.delivered_at.is_some() {
            tx.commit().await?;
            return Ok(false);
        }
        let Some(order) = orders::lock_for_update(&mut tx, &shipment.order_id).await? else {
            return Ok(false);
        };

        let now = Utc::now();
        proofs::insert(
            &mut tx,
            &proofs::NewProof {
                shipment_no: shipment.shipment_no,
                kind: ProofKind::DropCountersign,
                signer: locked.counterparty.0,
                claimed_ts: claimed_ts as i64,
                distance_meters: None,
                within_radius: true,
            },
        )
        .await?;
        shipments::mark_delivered(&mut tx, &shipment.id, now).await?;
        shipments::merge_metadata(
            &mut tx,
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
        orders::mark_delivered(&mut tx, &order.id, now).await?;
        orders::merge_metadata(
            &mut tx,
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
        // The original counterparty signature only ever existed as an HTTP
        // request body; if the first attempt never reached `mark_completed`
        // it's gone, and the chain call it authorized is already final.
        sessions::mark_completed(&mut tx, locked.session_uid, &[]).await?;
        tx.commit().await?;

        tracing::warn!(shipment_id = %locked.shipment_id, tx = %tx_hash, "recovery pass caught up drop settlement");
        Ok(true)
    }
}
