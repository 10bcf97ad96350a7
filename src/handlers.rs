//! The HTTP surface (spec.md §6): signing-session creation, resolution, and
//! countersignature submission, plus an ambient liveness probe. Mirrors the
//! teacher's `handlers.rs`: one `PodxState` extractor, one `routes()`
//! constructor, `PodxError`'s `IntoResponse` impl does all error→status
//! mapping so handlers stay thin.

use std::sync::Arc;

use alloy_primitives::Address;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::attestation::{rebuild_drop_attestation, rebuild_pickup_attestation, DropApprovalMessage, PickupApprovalMessage};
use crate::chain::ChainGateway;
use crate::db::models::SigningSessionRow;
use crate::error::PodxError;
use crate::session::{CreateSessionInput, CreateSessionOutput, SessionStore};
use crate::settlement::{SettleOutcome, SettlementCoordinator};
use crate::types::{ChainOrderId, SessionKind, SessionStatus};
use crate::verifier::Verifier;

/// Everything a handler needs, shared across requests behind an `Arc`. The
/// teacher's `FacilitatorLocal` plays the same role for `/verify`/`/settle`.
pub struct PodxState {
    pub sessions: Arc<SessionStore>,
    pub settlement: Arc<SettlementCoordinator>,
    pub verifier: Arc<Verifier>,
    pub chain: Arc<ChainGateway>,
}

pub fn routes() -> Router<Arc<PodxState>> {
    Router::new()
        .route("/healthz", get(get_healthz))
        .route("/signing-sessions", post(create_session))
        .route("/signing-sessions/{session_id}", get(get_session))
        .route("/signing-sessions/{session_id}/sign", post(sign_session))
}

/// `GET /healthz`: ambient liveness probe, not part of the protocol surface
/// (spec.md §6 lists only the three signing-session routes). Reports the
/// oracle address so a deploy can be sanity-checked against
/// `OrderRegistry.deliveryOracle()` without a separate RPC call.
#[instrument(skip_all)]
async fn get_healthz(State(state): State<Arc<PodxState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "oracle": state.chain.oracle_address().to_string(),
        "chainId": state.chain.chain_id(),
    }))
}

/// `POST /signing-sessions` (spec.md §6): a courier submits a signed
/// milestone and receives a one-time link for the counterparty.
#[instrument(skip_all, fields(shipment_id = %input.shipment_id, kind = ?input.kind))]
async fn create_session(
    State(state): State<Arc<PodxState>>,
    Json(input): Json<CreateSessionInput>,
) -> Result<Json<CreateSessionOutput>, PodxError> {
    let output = state.sessions.create(input, &state.verifier).await?;
    Ok(Json(output))
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    t: Option<String>,
}

/// `GET /signing-sessions/{sessionId}?t={token}` (spec.md §6): the
/// counterparty fetches the typed data it must countersign. Authorisation is
/// the token alone — there is no session/bearer auth beyond it.
#[instrument(skip_all, fields(session_id = %session_id))]
async fn get_session(
    State(state): State<Arc<PodxState>>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<serde_json::Value>, PodxError> {
    let token = query.t.ok_or(PodxError::TokenMissing)?;
    let resolved = state.sessions.resolve(session_id, &token).await?;
    let typed_data = wallet_typed_data(
        resolved.row.kind,
        &resolved.typed_data,
        state.sessions.chain_id(),
        state.sessions.verifying_contract(),
    )?;
    Ok(Json(json!({
        "session": SessionView::from(&resolved.row),
        "typedData": typed_data,
    })))
}

/// Wraps the stored `{kind, message}` payload into the `eth_signTypedData_v4`
/// shape (`domain`/`types`/`primaryType`/`message`) a wallet needs to produce
/// the countersignature `completeSession` expects (spec.md §4.1, §6). The
/// typed-struct fields (`shipmentId`, `locationHash`, …) are rebuilt from the
/// stored wire message exactly as [`crate::session::SessionStore`] first
/// built them — never re-derived from anything the caller supplies.
fn wallet_typed_data(kind: SessionKind, payload: &serde_json::Value, chain_id: u64, verifying_contract: Address) -> Result<serde_json::Value, PodxError> {
    let domain = json!({
        "name": "PODxShipment",
        "version": "1",
        "chainId": chain_id,
        "verifyingContract": verifying_contract.to_string(),
    });
    let domain_type = json!([
        {"name": "name", "type": "string"},
        {"name": "version", "type": "string"},
        {"name": "chainId", "type": "uint256"},
        {"name": "verifyingContract", "type": "address"},
    ]);

    match kind {
        SessionKind::Pickup => {
            let message: PickupApprovalMessage = serde_json::from_value(payload["message"].clone())
                .map_err(|e| PodxError::Internal(format!("malformed session payload: {e}")))?;
            let attestation = rebuild_pickup_attestation(&message).map_err(PodxError::Internal)?;
            Ok(json!({
                "domain": domain,
                "primaryType": "PickupApproval",
                "types": {
                    "EIP712Domain": domain_type,
                    "PickupApproval": [
                        {"name": "shipmentId", "type": "bytes32"},
                        {"name": "orderId", "type": "uint256"},
                        {"name": "locationHash", "type": "bytes32"},
                        {"name": "claimedTs", "type": "uint64"},
                    ],
                },
                "message": {
                    "shipmentId": attestation.typed.shipmentId.to_string(),
                    "orderId": attestation.typed.orderId.to_string(),
                    "locationHash": attestation.typed.locationHash.to_string(),
                    "claimedTs": attestation.typed.claimedTs.to_string(),
                },
            }))
        }
        SessionKind::Drop => {
            let message: DropApprovalMessage = serde_json::from_value(payload["message"].clone())
                .map_err(|e| PodxError::Internal(format!("malformed session payload: {e}")))?;
            let attestation = rebuild_drop_attestation(&message).map_err(PodxError::Internal)?;
            Ok(json!({
                "domain": domain,
                "primaryType": "DropApproval",
                "types": {
                    "EIP712Domain": domain_type,
                    "DropApproval": [
                        {"name": "shipmentId", "type": "bytes32"},
                        {"name": "orderId", "type": "uint256"},
                        {"name": "locationHash", "type": "bytes32"},
                        {"name": "claimedTs", "type": "uint64"},
                        {"name": "distanceMeters", "type": "uint256"},
                    ],
                },
                "message": {
                    "shipmentId": attestation.typed.shipmentId.to_string(),
                    "orderId": attestation.typed.orderId.to_string(),
                    "locationHash": attestation.typed.locationHash.to_string(),
                    "claimedTs": attestation.typed.claimedTs.to_string(),
                    "distanceMeters": attestation.typed.distanceMeters.to_string(),
                },
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignBody {
    signature: String,
}

/// `POST /signing-sessions/{sessionId}/sign?t={token}` (spec.md §6): the
/// counterparty submits its countersignature, triggering settlement.
#[instrument(skip_all, fields(session_id = %session_id))]
async fn sign_session(
    State(state): State<Arc<PodxState>>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
    Json(body): Json<SignBody>,
) -> Result<Json<SettleOutcome>, PodxError> {
    let token = query.t.ok_or(PodxError::TokenMissing)?;
    let resolved = state.sessions.resolve(session_id, &token).await?;
    let signature = parse_hex_signature(&body.signature)?;
    let outcome = state.settlement.complete(resolved, &token, signature).await?;
    Ok(Json(outcome))
}

fn parse_hex_signature(raw: &str) -> Result<Vec<u8>, PodxError> {
    hex::decode(raw.trim_start_matches("0x")).map_err(|_| PodxError::BadSignature {
        expected_signer: None,
        recovered: None,
    })
}

/// The session fields returned to clients, separate from [`SigningSessionRow`]
/// so internal columns (`context_hash`, raw signature bytes) never leak.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    session_id: Uuid,
    shipment_id: String,
    kind: SessionKind,
    status: SessionStatus,
    chain_order_id: String,
    courier: String,
    counterparty: String,
    deadline: DateTime<Utc>,
}

impl From<&SigningSessionRow> for SessionView {
    fn from(row: &SigningSessionRow) -> Self {
        let chain_order_id: ChainOrderId = row.chain_order_id.into();
        Self {
            session_id: row.session_uid,
            shipment_id: row.shipment_id.clone(),
            kind: row.kind,
            status: row.status,
            chain_order_id: chain_order_id.to_string(),
            courier: row.courier.0.to_string(),
            counterparty: row.counterparty.0.to_string(),
            deadline: row.deadline,
        }
    }
}
