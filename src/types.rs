//! Shared value types used across the attestation and settlement core.
//!
//! These mirror the entities in the data model: addresses and 256-bit
//! integers reuse `alloy_primitives` so they interoperate directly with the
//! chain gateway, while wire-facing fields that must survive JSON transport
//! without precision loss (`uint256`) are carried as decimal strings.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 256-bit on-chain order identifier.
///
/// The source system accepts either hex (`0x…`) or decimal input for this
/// field; both are preserved on input but the canonical stored/wire form is
/// a decimal string (spec.md §9 "Open question").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainOrderId(pub U256);

impl fmt::Display for ChainOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainOrderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            U256::from_str_radix(hex, 16).map_err(|e| e.to_string())?
        } else {
            U256::from_str_radix(s, 10).map_err(|e| e.to_string())?
        };
        Ok(ChainOrderId(value))
    }
}

impl Serialize for ChainOrderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainOrderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let s = match raw {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected string or number for chainOrderId, got {other}"
                )));
            }
        };
        ChainOrderId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A fresh 96-bit random value used as a magic-link `jti`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jti(pub [u8; 12]);

impl Jti {
    pub fn random() -> Self {
        let mut bytes = [0u8; 12];
        rand::Rng::fill(&mut rand::rng(), &mut bytes);
        Jti(bytes)
    }
}

impl fmt::Display for Jti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for Jti {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Jti {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        if bytes.len() != 12 {
            return Err(serde::de::Error::custom("jti must be 12 bytes"));
        }
        let mut arr = [0u8; 12];
        arr.copy_from_slice(&bytes);
        Ok(Jti(arr))
    }
}

/// Which milestone a signing session attests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Pickup,
    Drop,
}

/// The counterparty role a magic link is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "counterparty_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CounterpartyRole {
    Supplier,
    Buyer,
}

impl SessionKind {
    /// The role expected to countersign this kind of milestone.
    pub fn counterparty_role(self) -> CounterpartyRole {
        match self {
            SessionKind::Pickup => CounterpartyRole::Supplier,
            SessionKind::Drop => CounterpartyRole::Buyer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    PendingSupplier,
    PendingBuyer,
    Completed,
    Expired,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Expired | SessionStatus::Cancelled
        )
    }

    pub fn pending_for(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Pickup => SessionStatus::PendingSupplier,
            SessionKind::Drop => SessionStatus::PendingBuyer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Funded,
    Shipped,
    Delivered,
    Disputed,
    Resolved,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shipment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Created,
    InTransit,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "proof_kind", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProofKind {
    Pickup,
    Drop,
    PickupCountersign,
    DropCountersign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Escrowed,
    Released,
    Refunded,
}

/// A line item on an order, used for inventory replenishment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub sku_id: String,
    pub qty: f64,
}

/// Newtype wrapper making it clear a [`B256`] is a keccak256 digest, not raw
/// signed data.
pub type Digest = B256;

/// Newtype wrapper for an on-chain transaction hash, re-exported for callers
/// that don't want to depend on `alloy_primitives` directly.
pub type TxHash = B256;

/// Re-exported for convenience at the crate boundary.
pub type Addr = Address;
