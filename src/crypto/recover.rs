//! ECDSA address recovery over a prehashed EIP-712 digest.

use alloy_primitives::{Address, Signature, B256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoverError {
    #[error("malformed signature: {0}")]
    Malformed(String),
    #[error("recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Recovers the signing address from a 65-byte `r||s||v` signature over a
/// prehashed digest. Accepts `v` in either `{27, 28}` or `{0, 1}` form —
/// `alloy_primitives::Signature` normalizes both encodings transparently.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, RecoverError> {
    let raw: [u8; 65] = signature
        .try_into()
        .map_err(|_| RecoverError::Malformed(format!("expected 65 bytes, got {}", signature.len())))?;
    let sig = Signature::from_raw_array(&raw).map_err(|e| RecoverError::Malformed(e.to_string()))?;
    sig.recover_address_from_prehash(&digest)
        .map_err(|e| RecoverError::RecoveryFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    #[test]
    fn recovers_signer_for_v_27_and_28_equivalently() {
        let signer = PrivateKeySigner::from_slice(&[7u8; 32]).unwrap();
        let digest = B256::from(U256::from(42u64));
        let sig = signer.sign_hash_sync(&digest).unwrap();
        let recovered = recover_signer(digest, &sig.as_bytes()).unwrap();
        assert_eq!(recovered, signer.address());
    }
}
