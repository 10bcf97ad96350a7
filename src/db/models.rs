//! Relational row types (spec.md §3), one struct per entity, decorated with
//! `sqlx::FromRow` the way the teacher's wire types derive `Serialize`.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::metadata::Metadata;
use crate::types::{ChainOrderId, CounterpartyRole, OrderStatus, PaymentStatus, ProofKind, SessionKind, SessionStatus, ShipmentStatus};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: String,
    #[sqlx(try_from = "String")]
    pub buyer: AddressColumn,
    #[sqlx(try_from = "String")]
    pub supplier: AddressColumn,
    pub total_amount: Decimal,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub chain_order_id: ChainOrderIdColumn,
    pub status: OrderStatus,
    pub metadata: sqlx::types::Json<Metadata>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShipmentRow {
    pub id: String,
    pub order_id: String,
    pub shipment_no: i64,
    #[sqlx(try_from = "String")]
    pub supplier: AddressColumn,
    #[sqlx(try_from = "String")]
    pub buyer: AddressColumn,
    #[sqlx(try_from = "Option<String>")]
    pub assigned_courier: OptionAddressColumn,
    pub pickup_lat: f64,
    pub pickup_lon: f64,
    pub drop_lat: f64,
    pub drop_lon: f64,
    pub due_by: DateTime<Utc>,
    pub status: ShipmentStatus,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub metadata: sqlx::types::Json<Metadata>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SigningSessionRow {
    pub session_uid: Uuid,
    pub shipment_id: String,
    pub kind: SessionKind,
    #[sqlx(try_from = "String")]
    pub courier: AddressColumn,
    #[sqlx(try_from = "String")]
    pub counterparty: AddressColumn,
    #[sqlx(try_from = "String")]
    pub chain_order_id: ChainOrderIdColumn,
    pub deadline: DateTime<Utc>,
    pub status: SessionStatus,
    pub courier_nonce: Uuid,
    pub supplier_nonce: Option<Uuid>,
    pub context_hash: Vec<u8>,
    pub courier_signature: Vec<u8>,
    pub counterparty_signature: Option<Vec<u8>>,
    pub payload: sqlx::types::Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MagicLinkRow {
    pub token_hash: Vec<u8>,
    pub role: CounterpartyRole,
    pub jti: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub session_uid: Uuid,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProofRow {
    pub id: i64,
    pub shipment_no: i64,
    pub kind: ProofKind,
    #[sqlx(try_from = "String")]
    pub signer: AddressColumn,
    pub claimed_ts: i64,
    pub photo_hash: Option<String>,
    pub photo_cid: Option<String>,
    pub distance_meters: Option<i64>,
    pub within_radius: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub order_id: String,
    #[sqlx(try_from = "String")]
    pub payer: AddressColumn,
    #[sqlx(try_from = "String")]
    pub payee: AddressColumn,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub escrow_tx: Option<String>,
    pub release_tx: Option<String>,
}

/// A product row touched by inventory replenishment (spec.md §4.8). Not a
/// core entity in §3, but the settlement transaction updates it, so it's
/// modeled alongside the others.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    #[sqlx(try_from = "String")]
    pub owner: AddressColumn,
    pub sku_id: String,
    pub name: String,
    pub target_stock: f64,
    pub min_threshold: f64,
    pub unit: String,
    pub active: bool,
}

/// Wraps [`Address`] so `sqlx`'s `try_from = "String"` column attribute has a
/// concrete `TryFrom<String>` target distinct from the orphan `Address` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressColumn(pub Address);

impl TryFrom<String> for AddressColumn {
    type Error = alloy_primitives::AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(AddressColumn(value.parse()?))
    }
}

impl From<AddressColumn> for Address {
    fn from(value: AddressColumn) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionAddressColumn(pub Option<Address>);

impl TryFrom<Option<String>> for OptionAddressColumn {
    type Error = alloy_primitives::AddressError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        match value {
            Some(s) => Ok(OptionAddressColumn(Some(s.parse()?))),
            None => Ok(OptionAddressColumn(None)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOrderIdColumn(pub ChainOrderId);

impl TryFrom<String> for ChainOrderIdColumn {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(ChainOrderIdColumn(value.parse()?))
    }
}

impl From<ChainOrderIdColumn> for ChainOrderId {
    fn from(value: ChainOrderIdColumn) -> Self {
        value.0
    }
}
