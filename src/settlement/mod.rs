//! Orchestrates `completeSession` (spec.md §4.6): verifies the counterparty
//! signature, submits the on-chain confirmation, and — only once that
//! succeeds — commits the matching relational transition.

mod drop;
mod pickup;
pub mod recovery;

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

use crate::chain::ChainGateway;
use crate::db::{magic_links, orders, sessions, shipments};
use crate::error::PodxError;
use crate::magic_link;
use crate::session::ResolvedSession;
use crate::state_machine;
use crate::types::SessionKind;
use crate::verifier::Verifier;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_tx: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_tx: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_reward_wei: Option<String>,
}

pub struct SettlementCoordinator {
    pool: PgPool,
    gateway: Arc<ChainGateway>,
    verifier: Arc<Verifier>,
    reward_per_meter: u64,
}

impl SettlementCoordinator {
    pub fn new(pool: PgPool, gateway: Arc<ChainGateway>, verifier: Arc<Verifier>, reward_per_meter: u64) -> Self {
        Self {
            pool,
            gateway,
            verifier,
            reward_per_meter,
        }
    }

    /// Completes a resolved session: verifies `counterparty_signature`, then
    /// settles on-chain and commits the DB transition (spec.md §4.4
    /// `completeSession`).
    #[tracing::instrument(skip(self, resolved, counterparty_signature, token))]
    pub async fn complete(&self, resolved: ResolvedSession, token: &str, counterparty_signature: Vec<u8>) -> Result<SettleOutcome, PodxError> {
        let row = resolved.row;
        let digest = B256::from_slice(&row.context_hash);
        let counterparty: Address = row.counterparty.into();

        let outcome = self
            .verifier
            .verify(counterparty, digest, &counterparty_signature)
            .await
            .map_err(|e| PodxError::ChainFailed(e.to_string()))?;
        if !outcome.valid {
            return Err(PodxError::BadSignature {
                expected_signer: Some(counterparty.to_string()),
                recovered: outcome.recovered.map(|a| a.to_string()),
            });
        }

        let mut tx = self.pool.begin().await?;
        let locked = sessions::lock_for_update(&mut tx, row.session_uid).await?.ok_or(PodxError::SessionGone)?;
        if locked.status != crate::types::SessionStatus::pending_for(locked.kind) {
            return Err(PodxError::SessionGone);
        }

        let shipment = shipments::lock_for_update(&mut tx, &locked.shipment_id).await?.ok_or(PodxError::ShipmentState)?;
        let order = orders::lock_for_update(&mut tx, &shipment.order_id).await?.ok_or(PodxError::ShipmentState)?;

        let settle_result = match locked.kind {
            SessionKind::Pickup => {
                state_machine::assert_pickup_settleable(&shipment)?;
                pickup::settle(&mut tx, &self.gateway, &locked, &shipment, &order, &counterparty_signature)
                    .await
                    .map(|tx_hash| SettleOutcome {
                        ok: true,
                        pickup_tx: Some(tx_hash),
                        drop_tx: None,
                        courier_reward_wei: None,
                    })
            }
            SessionKind::Drop => {
                state_machine::assert_drop_settleable(&shipment)?;
                drop::settle(&mut tx, &self.gateway, &locked, &shipment, &order, &counterparty_signature, self.reward_per_meter)
                    .await
                    .map(|(tx_hash, reward)| SettleOutcome {
                        ok: true,
                        pickup_tx: None,
                        drop_tx: Some(tx_hash),
                        courier_reward_wei: Some(reward.to_string()),
                    })
            }
        }?;

        let now = Utc::now();
        sessions::mark_completed(&mut tx, locked.session_uid, &counterparty_signature).await?;
        let token_hash = magic_link::token_hash(token);
        magic_links::mark_used(&mut tx, &token_hash, now).await?;

        tx.commit().await?;
        Ok(settle_result)
    }
}
