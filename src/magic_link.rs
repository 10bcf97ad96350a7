//! HMAC-signed capability tokens (spec.md §4.5).
//!
//! A token is `base64url(payload) + "." + base64url(HMAC-SHA256(secret,
//! payload))`. The payload carries everything needed to re-derive the
//! session it authorises, so the server never has to trust anything the
//! client sends beyond the token itself.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::types::{CounterpartyRole, Jti};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkPayload {
    pub sid: String,
    pub role: CounterpartyRole,
    pub jti: Jti,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum MagicLinkError {
    #[error("token missing")]
    Missing,
    #[error("token malformed")]
    Malformed,
    #[error("hmac verification failed")]
    BadMac,
    #[error("token expired")]
    Expired,
}

/// Mints a token for `payload`, signed with `secret`.
pub fn issue(secret: &[u8], payload: &MagicLinkPayload) -> String {
    let payload_json = serde_json::to_vec(payload).expect("magic link payload always serializes");
    let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_json);
    let mac = compute_mac(secret, payload_b64.as_bytes());
    let mac_b64 = URL_SAFE_NO_PAD.encode(mac);
    format!("{payload_b64}.{mac_b64}")
}

/// `SHA-256(token)`, used as the lookup key for the stored magic-link row
/// without ever persisting the token itself.
pub fn token_hash(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

fn compute_mac(secret: &[u8], payload_b64: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload_b64);
    mac.finalize().into_bytes().into()
}

/// Verifies the token's HMAC and expiry, returning its payload. Does not
/// check role or single-use state — those depend on the session row and are
/// checked by the caller ([`crate::session`]) after looking up the magic
/// link by [`token_hash`].
pub fn verify(secret: &[u8], token: &str, now: i64) -> Result<MagicLinkPayload, MagicLinkError> {
    if token.is_empty() {
        return Err(MagicLinkError::Missing);
    }
    let (payload_b64, mac_b64) = token.split_once('.').ok_or(MagicLinkError::Malformed)?;
    let given_mac = URL_SAFE_NO_PAD.decode(mac_b64).map_err(|_| MagicLinkError::Malformed)?;
    let expected_mac = compute_mac(secret, payload_b64.as_bytes());
    if given_mac.len() != expected_mac.len() || given_mac.ct_eq(&expected_mac).unwrap_u8() != 1 {
        return Err(MagicLinkError::BadMac);
    }
    let payload_json = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| MagicLinkError::Malformed)?;
    let payload: MagicLinkPayload = serde_json::from_slice(&payload_json).map_err(|_| MagicLinkError::Malformed)?;
    if payload.exp <= now {
        return Err(MagicLinkError::Expired);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload(exp: i64) -> MagicLinkPayload {
        MagicLinkPayload {
            sid: "11111111-2222-3333-4444-555555555555".to_string(),
            role: CounterpartyRole::Supplier,
            jti: Jti::random(),
            exp,
        }
    }

    #[test]
    fn round_trips_a_valid_token() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let payload = sample_payload(2_000_000_000);
        let token = issue(secret, &payload);
        let recovered = verify(secret, &token, 1_000_000_000).unwrap();
        assert_eq!(recovered.sid, payload.sid);
        assert_eq!(recovered.role, payload.role);
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let payload = sample_payload(2_000_000_000);
        let token = issue(secret, &payload);
        let (payload_b64, mac_b64) = token.split_once('.').unwrap();
        let mut tampered_json = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        tampered_json[0] ^= 0xFF;
        let tampered_b64 = URL_SAFE_NO_PAD.encode(tampered_json);
        let tampered_token = format!("{tampered_b64}.{mac_b64}");
        assert!(matches!(
            verify(secret, &tampered_token, 1_000_000_000),
            Err(MagicLinkError::BadMac)
        ));
    }

    #[test]
    fn token_at_deadline_minus_one_second_is_valid_at_plus_one_is_not() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let deadline = 1_700_000_100i64;
        let payload = sample_payload(deadline - 1);
        let token = issue(secret, &payload);
        assert!(verify(secret, &token, deadline - 2).is_ok());

        let payload_expired = sample_payload(deadline + 1);
        let token_expired = issue(secret, &payload_expired);
        assert!(matches!(
            verify(secret, &token_expired, deadline + 2),
            Err(MagicLinkError::Expired)
        ));
    }

    #[test]
    fn rejects_empty_token() {
        assert!(matches!(verify(b"secret", "", 0), Err(MagicLinkError::Missing)));
    }
}
