//! Attestation & settlement core for the PODx supply-chain escrow protocol.
//!
//! PODx coordinates a four-party fulfillment flow — buyer, supplier, courier,
//! and an on-chain escrow — so that funds release only once cryptographically
//! attested pickup and drop events have been recorded. This crate implements
//! the server-side core: it mints time-bounded counter-signature capabilities,
//! verifies EIP-712 signatures and geofence constraints, computes bounded
//! courier rewards, and commits an atomic transition of relational state plus
//! on-chain calls.
//!
//! # Modules
//!
//! - [`config`] — flat environment/CLI-driven server configuration.
//! - [`crypto`] — Keccak-256, EIP-712 domain/struct hashing, ECDSA recovery.
//! - [`geo`] — haversine distance and geofence checks.
//! - [`attestation`] — deterministic `PickupApproval`/`DropApproval` typed data.
//! - [`verifier`] — EOA + ERC-1271 signature verification.
//! - [`magic_link`] — HMAC-signed single-use capability tokens.
//! - [`metadata`] — typed key/value metadata stored alongside orders/shipments.
//! - [`db`] — relational models and repositories.
//! - [`session`] — signing session lifecycle (create/resolve/complete/expire).
//! - [`state_machine`] — order/shipment/session guard conditions.
//! - [`chain`] — typed wrappers over the escrow/order/shipment contracts.
//! - [`settlement`] — pickup/drop settlement coordination.
//! - [`inventory`] — buyer stock replenishment on delivery.
//! - [`handlers`] — the HTTP surface.
//! - [`sweep`] — the background session-expiry and recovery task.
//! - [`sig_down`] — SIGTERM/SIGINT-driven graceful shutdown.
//! - [`telemetry`] — structured logging setup.
//! - [`types`] — shared newtypes and wire enums.
//! - [`error`] — the error taxonomy shared across modules.

pub mod attestation;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod inventory;
pub mod magic_link;
pub mod metadata;
pub mod session;
pub mod settlement;
pub mod sig_down;
pub mod state_machine;
pub mod sweep;
pub mod telemetry;
pub mod types;
pub mod verifier;

pub use error::PodxError;
