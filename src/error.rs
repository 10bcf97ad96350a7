//! The error taxonomy surfaced to HTTP clients (spec.md §7).
//!
//! Variants are opaque identifiers, not implementation details: messages
//! never leak signer keys, HMAC secrets, or raw stack traces. Diagnostic
//! fields (`expectedSigner`, `recovered`) are attached only to
//! [`PodxError::BadSignature`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PodxError {
    #[error("token missing")]
    TokenMissing,
    #[error("token invalid")]
    TokenInvalid,
    #[error("link expired")]
    LinkExpired,
    #[error("link already used")]
    LinkUsed,
    #[error("session gone")]
    SessionGone,
    #[error("token role does not match session's expected counterparty")]
    RoleMismatch,
    #[error("location outside geofence")]
    RadiusExceeded,
    #[error("signature verification failed")]
    BadSignature {
        expected_signer: Option<String>,
        recovered: Option<String>,
    },
    #[error("claimed distance diverges from planned distance by more than 5m")]
    BadDistance,
    #[error("shipment/order/session is not in a state that allows this transition")]
    ShipmentState,
    #[error("chain call failed: {0}")]
    ChainFailed(String),
    #[error("session conflict: an active session already exists for this (shipment, kind)")]
    SessionConflict,
    #[error("invalid startup configuration: {0}")]
    Config(String),
    #[error("persistence error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_signer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recovered: Option<&'a str>,
}

impl PodxError {
    /// The opaque identifier returned to clients, matching spec.md §7's table.
    pub fn kind(&self) -> &'static str {
        match self {
            PodxError::TokenMissing => "TOKEN_MISSING",
            PodxError::TokenInvalid => "TOKEN_INVALID",
            PodxError::LinkExpired => "LINK_EXPIRED",
            PodxError::LinkUsed => "LINK_USED",
            PodxError::SessionGone => "SESSION_GONE",
            PodxError::RoleMismatch => "ROLE_MISMATCH",
            PodxError::RadiusExceeded => "RADIUS_EXCEEDED",
            PodxError::BadSignature { .. } => "BAD_SIGNATURE",
            PodxError::BadDistance => "BAD_DISTANCE",
            PodxError::ShipmentState => "SHIPMENT_STATE",
            PodxError::ChainFailed(_) => "CHAIN_FAILED",
            PodxError::SessionConflict => "SESSION_CONFLICT",
            PodxError::Config(_) => "CONFIG",
            PodxError::Db(_) => "CHAIN_FAILED",
            PodxError::Internal(_) => "CHAIN_FAILED",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            PodxError::TokenMissing => StatusCode::BAD_REQUEST,
            PodxError::TokenInvalid => StatusCode::FORBIDDEN,
            PodxError::LinkExpired => StatusCode::FORBIDDEN,
            PodxError::LinkUsed => StatusCode::CONFLICT,
            PodxError::SessionGone => StatusCode::NOT_FOUND,
            PodxError::RoleMismatch => StatusCode::FORBIDDEN,
            PodxError::RadiusExceeded => StatusCode::FORBIDDEN,
            PodxError::BadSignature { .. } => StatusCode::BAD_REQUEST,
            PodxError::BadDistance => StatusCode::BAD_REQUEST,
            PodxError::ShipmentState => StatusCode::CONFLICT,
            PodxError::SessionConflict => StatusCode::CONFLICT,
            PodxError::ChainFailed(_) => StatusCode::BAD_GATEWAY,
            PodxError::Db(_) | PodxError::Internal(_) => StatusCode::BAD_GATEWAY,
            PodxError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PodxError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, kind = self.kind(), "request failed");
        let status = self.status();
        let (expected_signer, recovered) = match &self {
            PodxError::BadSignature {
                expected_signer,
                recovered,
            } => (expected_signer.as_deref(), recovered.as_deref()),
            _ => (None, None),
        };
        let body = ErrorBody {
            error: self.kind(),
            expected_signer,
            recovered,
        };
        (status, Json(body)).into_response()
    }
}
