//! Cryptographic primitives: Keccak-256, EIP-712 domain/struct hashing, and
//! ECDSA address recovery. The EIP-1271 contract-wallet fallback lives in
//! [`crate::verifier`], since it needs a chain provider.

pub mod eip712;
pub mod recover;

pub use eip712::{domain, DropApproval, PickupApproval};
pub use recover::recover_signer;
