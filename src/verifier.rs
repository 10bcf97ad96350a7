//! Signature verification with EOA recovery and an ERC-1271 smart-wallet
//! fallback (spec.md §4.2).
//!
//! Every verification first tries off-chain ECDSA recovery, since that's the
//! common case and needs no RPC round trip. Only when the recovered address
//! doesn't match the expected signer — and the expected signer turns out to
//! have contract code — does this fall back to an on-chain
//! `isValidSignature` call. Contract-code lookups are cached for the process
//! lifetime: a wallet's EOA/contract nature doesn't change shipment to
//! shipment.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use tokio::sync::RwLock;

use crate::chain::ChainGateway;
use crate::crypto::recover_signer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub recovered: Option<Address>,
}

pub struct Verifier {
    gateway: Arc<ChainGateway>,
    is_contract_cache: RwLock<HashMap<Address, bool>>,
}

impl Verifier {
    pub fn new(gateway: Arc<ChainGateway>) -> Self {
        Self {
            gateway,
            is_contract_cache: RwLock::new(HashMap::new()),
        }
    }

    async fn is_contract(&self, address: Address) -> Result<bool, crate::chain::ChainGatewayError> {
        if let Some(cached) = self.is_contract_cache.read().await.get(&address) {
            return Ok(*cached);
        }
        let is_contract = self.gateway.is_contract(address).await?;
        self.is_contract_cache.write().await.insert(address, is_contract);
        Ok(is_contract)
    }

    /// Verifies `signature` over `digest` against `expected_signer`, trying
    /// EOA recovery first and ERC-1271 only if that fails and the expected
    /// signer is a contract.
    pub async fn verify(
        &self,
        expected_signer: Address,
        digest: B256,
        signature: &[u8],
    ) -> Result<VerifyOutcome, crate::chain::ChainGatewayError> {
        match recover_signer(digest, signature) {
            Ok(recovered) if recovered == expected_signer => {
                return Ok(VerifyOutcome {
                    valid: true,
                    recovered: Some(recovered),
                });
            }
            Ok(recovered) => {
                if self.is_contract(expected_signer).await? {
                    let valid = self.gateway.erc1271_is_valid(expected_signer, digest, signature).await?;
                    return Ok(VerifyOutcome {
                        valid,
                        recovered: Some(recovered),
                    });
                }
                return Ok(VerifyOutcome {
                    valid: false,
                    recovered: Some(recovered),
                });
            }
            Err(_) => {
                if self.is_contract(expected_signer).await? {
                    let valid = self.gateway.erc1271_is_valid(expected_signer, digest, signature).await?;
                    return Ok(VerifyOutcome { valid, recovered: None });
                }
                Ok(VerifyOutcome {
                    valid: false,
                    recovered: None,
                })
            }
        }
    }
}
