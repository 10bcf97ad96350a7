//! Signing session lifecycle: `createSession`, `resolveSession`, and the
//! background `expire()` sweep (spec.md §4.4). `completeSession` lives in
//! [`crate::settlement`], since completing a session means running the
//! settlement coordinator.

use alloy_primitives::{Address, B256};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::attestation::{build_drop_attestation, build_pickup_attestation, drop_signing_hash, pickup_signing_hash};
use crate::db::{magic_links, models::SigningSessionRow, sessions, shipments};
use crate::error::PodxError;
use crate::geo::{geodesic_distance_meters, within_radius};
use crate::magic_link::{self, MagicLinkError, MagicLinkPayload};
use crate::state_machine;
use crate::types::{ChainOrderId, CounterpartyRole, SessionKind, SessionStatus};
use crate::verifier::Verifier;

pub struct SessionStore {
    pool: PgPool,
    secret: Vec<u8>,
    ttl: Duration,
    default_radius_m: u32,
    chain_id: u64,
    verifying_contract: Address,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionInput {
    pub kind: SessionKind,
    pub shipment_id: String,
    pub chain_order_id: ChainOrderId,
    pub claimed_ts: u64,
    pub current_lat: f64,
    pub current_lon: f64,
    pub courier: Address,
    #[serde(deserialize_with = "hex_bytes")]
    pub courier_signature: Vec<u8>,
    pub distance_meters: Option<u64>,
    pub radius_m: Option<u32>,
}

/// Decodes a `0x`-prefixed (or bare) hex string into raw bytes — the wire
/// encoding every signature field uses over JSON (spec.md §6).
fn hex_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    hex::decode(raw.trim_start_matches("0x")).map_err(serde::de::Error::custom)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionOutput {
    pub session_id: Uuid,
    pub link: String,
    pub role: CounterpartyRole,
    pub kind: SessionKind,
    pub deadline: DateTime<Utc>,
}

pub struct ResolvedSession {
    pub row: SigningSessionRow,
    pub typed_data: serde_json::Value,
}

impl SessionStore {
    pub fn new(pool: PgPool, secret: Vec<u8>, ttl_minutes: i64, default_radius_m: u32, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            pool,
            secret,
            ttl: Duration::minutes(ttl_minutes),
            default_radius_m,
            chain_id,
            verifying_contract,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn verifying_contract(&self) -> Address {
        self.verifying_contract
    }

    #[tracing::instrument(skip(self, input), fields(shipment_id = %input.shipment_id, kind = ?input.kind))]
    pub async fn create(&self, input: CreateSessionInput, verifier: &Verifier) -> Result<CreateSessionOutput, PodxError> {
        state_machine::assert_claimed_ts_nonzero(input.claimed_ts)?;

        let mut tx = self.pool.begin().await?;
        let shipment = shipments::lock_for_update(&mut tx, &input.shipment_id)
            .await?
            .ok_or(PodxError::ShipmentState)?;

        match input.kind {
            SessionKind::Pickup => state_machine::assert_pickup_creatable(&shipment)?,
            SessionKind::Drop => state_machine::assert_drop_creatable(&shipment)?,
        }

        let (target_lat, target_lon) = match input.kind {
            SessionKind::Pickup => (shipment.pickup_lat, shipment.pickup_lon),
            SessionKind::Drop => (shipment.drop_lat, shipment.drop_lon),
        };
        let radius = input.radius_m.unwrap_or(self.default_radius_m);
        let distance_to_target = geodesic_distance_meters(target_lat, target_lon, input.current_lat, input.current_lon);
        if !within_radius(distance_to_target, radius) {
            return Err(PodxError::RadiusExceeded);
        }

        if input.kind == SessionKind::Drop {
            let planned = geodesic_distance_meters(shipment.pickup_lat, shipment.pickup_lon, shipment.drop_lat, shipment.drop_lon);
            let claimed = input.distance_meters.ok_or(PodxError::BadDistance)?;
            state_machine::assert_distance_matches(claimed, planned, 5)?;
        }

        let (digest, payload_json) = self.build_digest_and_payload(&input)?;
        let outcome = verifier.verify(input.courier, digest, &input.courier_signature).await.map_err(|e| PodxError::ChainFailed(e.to_string()))?;
        if !outcome.valid {
            return Err(PodxError::BadSignature {
                expected_signer: Some(input.courier.to_string()),
                recovered: outcome.recovered.map(|a| a.to_string()),
            });
        }

        let now = Utc::now();
        let deadline = now + self.ttl;
        let session_uid = Uuid::new_v4();
        let role = input.kind.counterparty_role();
        let status = SessionStatus::pending_for(input.kind);
        let counterparty = match role {
            CounterpartyRole::Supplier => shipment.supplier.0,
            CounterpartyRole::Buyer => shipment.buyer.0,
        };

        let new_session = sessions::NewSession {
            session_uid,
            shipment_id: input.shipment_id.clone(),
            kind: input.kind,
            courier: input.courier,
            counterparty,
            chain_order_id: input.chain_order_id,
            deadline,
            status,
            courier_nonce: Uuid::new_v4(),
            context_hash: digest.as_slice().to_vec(),
            courier_signature: input.courier_signature.clone(),
            payload: payload_json,
        };
        sessions::insert(&mut tx, &new_session).await.map_err(|e| {
            if is_unique_violation(&e) {
                PodxError::SessionConflict
            } else {
                PodxError::Db(e)
            }
        })?;

        let jti = crate::types::Jti::random();
        let link_payload = MagicLinkPayload {
            sid: session_uid.to_string(),
            role,
            jti,
            exp: deadline.timestamp(),
        };
        let token = magic_link::issue(&self.secret, &link_payload);
        let token_hash = magic_link::token_hash(&token);
        magic_links::insert(
            &mut tx,
            &magic_links::NewMagicLink {
                token_hash,
                role,
                jti: jti.0,
                expires_at: deadline,
                session_uid,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(CreateSessionOutput {
            session_id: session_uid,
            link: token,
            role,
            kind: input.kind,
            deadline,
        })
    }

    fn build_digest_and_payload(&self, input: &CreateSessionInput) -> Result<(B256, serde_json::Value), PodxError> {
        match input.kind {
            SessionKind::Pickup => {
                let attestation = build_pickup_attestation(&input.shipment_id, input.chain_order_id, input.current_lat, input.current_lon, input.claimed_ts);
                let digest = pickup_signing_hash(&attestation, self.chain_id, self.verifying_contract);
                Ok((digest, json!({ "kind": "pickup", "message": attestation.message })))
            }
            SessionKind::Drop => {
                let distance_meters = input.distance_meters.ok_or(PodxError::BadDistance)?;
                let attestation = build_drop_attestation(&input.shipment_id, input.chain_order_id, input.current_lat, input.current_lon, input.claimed_ts, distance_meters);
                let digest = drop_signing_hash(&attestation, self.chain_id, self.verifying_contract);
                Ok((digest, json!({ "kind": "drop", "message": attestation.message })))
            }
        }
    }

    /// `resolveSession` (spec.md §4.4): constant-time token check, expiry,
    /// status, and single-use, then the typed data reconstructed from the
    /// stored payload — never from anything the caller supplies here.
    #[tracing::instrument(skip(self, token))]
    pub async fn resolve(&self, session_uid: Uuid, token: &str) -> Result<ResolvedSession, PodxError> {
        let now = Utc::now();
        let link_payload = magic_link::verify(&self.secret, token, now.timestamp()).map_err(map_magic_link_error)?;
        if link_payload.sid != session_uid.to_string() {
            return Err(PodxError::TokenInvalid);
        }

        let token_hash = magic_link::token_hash(token);
        let mut conn = self.pool.acquire().await?;
        let link_row = magic_links::find_by_token_hash(&mut conn, &token_hash).await?.ok_or(PodxError::SessionGone)?;
        if link_row.used_at.is_some() {
            return Err(PodxError::LinkUsed);
        }
        if link_row.role != link_payload.role {
            return Err(PodxError::RoleMismatch);
        }

        let row = sessions::find_by_uid(&self.pool, session_uid).await?.ok_or(PodxError::SessionGone)?;
        if row.deadline <= now {
            return Err(PodxError::LinkExpired);
        }
        if row.status != SessionStatus::pending_for(row.kind) {
            return Err(PodxError::SessionGone);
        }

        Ok(ResolvedSession {
            typed_data: row.payload.0.clone(),
            row,
        })
    }

    /// Background sweep (spec.md §4.4 `expire()`): flips stale `PENDING_*`
    /// sessions to `EXPIRED` and invalidates their magic links.
    pub async fn expire_stale(&self) -> Result<usize, PodxError> {
        let now = Utc::now();
        let expired = sessions::expire_past_deadline(&self.pool, now).await?;
        if !expired.is_empty() {
            let mut conn = self.pool.acquire().await?;
            magic_links::invalidate_for_sessions(&mut conn, &expired, now).await?;
        }
        Ok(expired.len())
    }
}

fn map_magic_link_error(err: MagicLinkError) -> PodxError {
    match err {
        MagicLinkError::Missing => PodxError::TokenMissing,
        MagicLinkError::Malformed | MagicLinkError::BadMac => PodxError::TokenInvalid,
        MagicLinkError::Expired => PodxError::LinkExpired,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}
