//! The on-chain surface: contract bindings, the oracle's nonce guard, and the
//! gateway that ties a provider and signer to typed, idempotent calls.

pub mod contracts;
pub mod gateway;
pub mod nonce;

pub use gateway::{ChainGateway, ChainGatewayError};
