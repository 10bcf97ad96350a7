//! Serializes nonce allocation for the oracle signer.
//!
//! The gateway owns exactly one signer, so unlike a general-purpose
//! multi-account nonce manager this only needs to track one counter — but the
//! locking discipline (fetch-with-pending on first use, increment locally
//! after, reset on failure) is the same one a multi-account manager would use
//! per address.

use std::sync::Arc;

use alloy_network::Network;
use alloy_primitives::Address;
use alloy_provider::fillers::NonceManager;
use alloy_provider::Provider;
use async_trait::async_trait;
use tokio::sync::Mutex;

const NONE: u64 = u64::MAX;

#[derive(Debug, Clone, Default)]
pub struct OracleNonceManager {
    nonce: Arc<Mutex<u64>>,
}

impl OracleNonceManager {
    pub fn new() -> Self {
        Self {
            nonce: Arc::new(Mutex::new(NONE)),
        }
    }

    /// A cheap handle sharing the same underlying counter, for installing
    /// into the provider's filler stack alongside the copy [`ChainGateway`]
    /// keeps for resetting on failure.
    pub fn clone_handle(&self) -> Self {
        self.clone()
    }

    /// Resets the cached nonce, forcing a fresh on-chain query on next use.
    /// Called after a chain call fails, since the transaction may or may not
    /// have reached the mempool.
    pub async fn reset(&self) {
        let mut nonce = self.nonce.lock().await;
        *nonce = NONE;
    }
}

#[async_trait]
impl NonceManager for OracleNonceManager {
    async fn get_next_nonce<P, N>(&self, provider: &P, address: Address) -> alloy_transport::TransportResult<u64>
    where
        P: Provider<N>,
        N: Network,
    {
        let mut nonce = self.nonce.lock().await;
        let new_nonce = if *nonce == NONE {
            provider.get_transaction_count(address).pending().await?
        } else {
            *nonce + 1
        };
        *nonce = new_nonce;
        Ok(new_nonce)
    }
}
