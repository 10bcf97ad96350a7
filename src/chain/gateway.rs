//! Owns the oracle signer and RPC connection, and exposes typed, idempotent
//! calls against the escrow, order registry, and shipment registry contracts
//! (spec.md §4.7 "Chain Gateway").

use std::sync::Arc;

use alloy_network::{Ethereum, EthereumWallet};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::fillers::{ChainIdFiller, FillProvider, GasFiller, Identity, JoinFill, NonceFiller, WalletFiller};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_rpc_types_eth::{Filter, TransactionReceipt};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolEvent;
use alloy_transport::TransportError;
use thiserror::Error;
use url::Url;

use crate::chain::contracts::{
    DropApprovalCalldata, IERC1271, IERC20, IEscrow, IOrderRegistry, IShipmentRegistry, PickupApprovalCalldata,
    ERC1271_MAGIC_VALUE,
};
use crate::chain::nonce::OracleNonceManager;

pub type InnerFiller = JoinFill<GasFiller, JoinFill<NonceFiller<OracleNonceManager>, ChainIdFiller>>;
pub type InnerProvider = FillProvider<JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>, RootProvider>;

#[derive(Debug, Error)]
pub enum ChainGatewayError {
    #[error("rpc transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("contract call error: {0}")]
    Contract(#[from] alloy_contract::Error),
    #[error(
        "configured oracle signer {configured} does not match on-chain deliveryOracle() {on_chain} \
         for the order registry"
    )]
    OracleMismatch { configured: Address, on_chain: Address },
}

/// Addresses of the three PODx contracts plus the settlement token.
#[derive(Debug, Clone, Copy)]
pub struct ContractAddresses {
    pub token: Address,
    pub escrow: Address,
    pub order_registry: Address,
    pub shipment_registry: Address,
}

/// The single chain connection PODx needs: one signer (the oracle), one RPC
/// endpoint, one set of deployed contracts.
pub struct ChainGateway {
    provider: InnerProvider,
    nonce_manager: OracleNonceManager,
    oracle_address: Address,
    chain_id: u64,
    contracts: ContractAddresses,
}

impl ChainGateway {
    /// Connects to `rpc_url`, loads the oracle signer, and asserts that the
    /// deployed [`IOrderRegistry`] agrees on who the oracle is. A mismatch is
    /// fatal: the gateway must never sign attestations a contract won't trust
    /// (spec.md §4.7, §9 "Global oracle signer").
    pub async fn connect(
        rpc_url: Url,
        chain_id: u64,
        oracle_signer: PrivateKeySigner,
        contracts: ContractAddresses,
    ) -> Result<Self, ChainGatewayError> {
        let oracle_address = oracle_signer.address();
        let wallet = EthereumWallet::from(oracle_signer);
        let nonce_manager = OracleNonceManager::new();
        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(NonceFiller::new(nonce_manager.clone_handle()), ChainIdFiller::default()),
        );
        let provider: InnerProvider = ProviderBuilder::default()
            .filler(filler)
            .wallet(wallet)
            .connect_http(rpc_url);

        let gateway = Self {
            provider,
            nonce_manager,
            oracle_address,
            chain_id,
            contracts,
        };
        gateway.assert_oracle_identity().await?;
        Ok(gateway)
    }

    async fn assert_oracle_identity(&self) -> Result<(), ChainGatewayError> {
        let registry = IOrderRegistry::new(self.contracts.order_registry, &self.provider);
        let on_chain = registry.deliveryOracle().call().await?;
        if on_chain != self.oracle_address {
            return Err(ChainGatewayError::OracleMismatch {
                configured: self.oracle_address,
                on_chain,
            });
        }
        Ok(())
    }

    pub fn oracle_address(&self) -> Address {
        self.oracle_address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn contracts(&self) -> ContractAddresses {
        self.contracts
    }

    /// Returns `true` if `address` has contract code, meaning an ERC-1271
    /// check should be attempted rather than raw ECDSA recovery.
    pub async fn is_contract(&self, address: Address) -> Result<bool, ChainGatewayError> {
        let code = self.provider.get_code_at(address).await?;
        Ok(!code.is_empty())
    }

    /// ERC-1271 `isValidSignature` check against a smart-contract wallet.
    pub async fn erc1271_is_valid(&self, wallet: Address, digest: B256, signature: &[u8]) -> Result<bool, ChainGatewayError> {
        let contract = IERC1271::new(wallet, &self.provider);
        let result = contract
            .isValidSignature(digest, Bytes::copy_from_slice(signature))
            .call()
            .await?;
        Ok(result.0 == ERC1271_MAGIC_VALUE)
    }

    /// Creates the order on-chain unless it already exists (idempotent per
    /// spec.md §4.7: "skip createOrder if the order already exists").
    pub async fn create_order_if_missing(
        &self,
        order_id: U256,
        buyer: Address,
        supplier: Address,
        amount: U256,
    ) -> Result<(), ChainGatewayError> {
        let registry = IOrderRegistry::new(self.contracts.order_registry, &self.provider);
        let existing = registry.orders(order_id).call().await?;
        if existing.buyer != Address::ZERO {
            return Ok(());
        }
        let tx = registry.createOrder(order_id, buyer, supplier, amount);
        self.send_and_await(tx).await?;
        Ok(())
    }

    /// Raises the escrow's token allowance only when the current allowance is
    /// insufficient (idempotent per spec.md §4.7: "skip approve if allowance
    /// already covers the order amount").
    pub async fn approve_if_needed(&self, spender: Address, amount: U256) -> Result<(), ChainGatewayError> {
        let token = IERC20::new(self.contracts.token, &self.provider);
        let current = token.allowance(self.oracle_address, spender).call().await?;
        if current >= amount {
            return Ok(());
        }
        let tx = token.approve(spender, amount);
        self.send_and_await(tx).await?;
        Ok(())
    }

    pub async fn fund(&self, order_id: U256, amount: U256) -> Result<(), ChainGatewayError> {
        let escrow = IEscrow::new(self.contracts.escrow, &self.provider);
        self.send_and_await(escrow.fund(order_id, amount)).await?;
        Ok(())
    }

    pub async fn escrowed_balance(&self, order_id: U256) -> Result<U256, ChainGatewayError> {
        let escrow = IEscrow::new(self.contracts.escrow, &self.provider);
        Ok(escrow.escrowed(order_id).call().await?)
    }

    pub async fn mark_funded(&self, order_id: U256) -> Result<(), ChainGatewayError> {
        let registry = IOrderRegistry::new(self.contracts.order_registry, &self.provider);
        self.send_and_await(registry.markFunded(order_id)).await?;
        Ok(())
    }

    pub async fn register_shipment(
        &self,
        shipment_id: B256,
        order_id: U256,
        buyer: Address,
        supplier: Address,
        courier: Address,
    ) -> Result<(), ChainGatewayError> {
        let registry = IShipmentRegistry::new(self.contracts.shipment_registry, &self.provider);
        self.send_and_await(registry.registerShipment(shipment_id, order_id, buyer, supplier, courier))
            .await?;
        Ok(())
    }

    pub async fn update_courier(&self, shipment_id: B256, courier: Address) -> Result<(), ChainGatewayError> {
        let registry = IShipmentRegistry::new(self.contracts.shipment_registry, &self.provider);
        self.send_and_await(registry.updateCourier(shipment_id, courier)).await?;
        Ok(())
    }

    pub async fn confirm_pickup(
        &self,
        approval: PickupApprovalCalldata,
        courier_sig: &[u8],
        counterparty_sig: &[u8],
    ) -> Result<B256, ChainGatewayError> {
        let registry = IShipmentRegistry::new(self.contracts.shipment_registry, &self.provider);
        let tx = registry.confirmPickup(
            approval,
            Bytes::copy_from_slice(courier_sig),
            Bytes::copy_from_slice(counterparty_sig),
        );
        let receipt = self.send_and_await(tx).await?;
        Ok(receipt.transaction_hash)
    }

    /// Confirms the drop on-chain and returns the transaction hash plus the
    /// `courierReward` parsed out of the `DropApproved` log, if the registry
    /// emitted one (spec.md §4.6 step 4).
    #[allow(clippy::too_many_arguments)]
    pub async fn confirm_drop(
        &self,
        approval: DropApprovalCalldata,
        courier_sig: &[u8],
        counterparty_sig: &[u8],
        line_items_json: String,
        metadata_uri: String,
    ) -> Result<(B256, Option<U256>), ChainGatewayError> {
        let registry = IShipmentRegistry::new(self.contracts.shipment_registry, &self.provider);
        let tx = registry.confirmDrop(
            approval,
            Bytes::copy_from_slice(courier_sig),
            Bytes::copy_from_slice(counterparty_sig),
            line_items_json,
            metadata_uri,
        );
        let receipt = self.send_and_await(tx).await?;
        let courier_reward = receipt
            .logs()
            .iter()
            .filter(|log| log.address() == self.contracts.shipment_registry)
            .find_map(|log| IShipmentRegistry::DropApproved::decode_log(&log.inner).ok().map(|decoded| decoded.courierReward));
        Ok((receipt.transaction_hash, courier_reward))
    }

    /// Scans the shipment registry's full log history for a `PickupApproved`
    /// event matching `shipment_id`, used by the recovery pass to detect a
    /// chain call that succeeded without a matching DB commit (spec.md §4.6
    /// "Commit ordering and recovery").
    pub async fn find_pickup_approved(&self, shipment_id: B256) -> Result<Option<(B256, u64)>, ChainGatewayError> {
        let filter = Filter::new()
            .address(self.contracts.shipment_registry)
            .event_signature(IShipmentRegistry::PickupApproved::SIGNATURE_HASH);
        let logs = self.provider.get_logs(&filter).await?;
        for log in logs {
            let Some(tx_hash) = log.transaction_hash else { continue };
            if let Ok(decoded) = IShipmentRegistry::PickupApproved::decode_log(&log.inner) {
                if decoded.shipmentId == shipment_id {
                    return Ok(Some((tx_hash, decoded.claimedTs)));
                }
            }
        }
        Ok(None)
    }

    /// Same as [`Self::find_pickup_approved`] but for `DropApproved`, also
    /// returning the `courierReward` the contract computed.
    pub async fn find_drop_approved(&self, shipment_id: B256) -> Result<Option<(B256, u64, U256)>, ChainGatewayError> {
        let filter = Filter::new()
            .address(self.contracts.shipment_registry)
            .event_signature(IShipmentRegistry::DropApproved::SIGNATURE_HASH);
        let logs = self.provider.get_logs(&filter).await?;
        for log in logs {
            let Some(tx_hash) = log.transaction_hash else { continue };
            if let Ok(decoded) = IShipmentRegistry::DropApproved::decode_log(&log.inner) {
                if decoded.shipmentId == shipment_id {
                    return Ok(Some((tx_hash, decoded.claimedTs, decoded.courierReward)));
                }
            }
        }
        Ok(None)
    }

    /// Sends a transaction and waits for its receipt, resetting the oracle's
    /// cached nonce on failure so the next call re-queries the chain rather
    /// than trusting a nonce that may never have landed.
    async fn send_and_await<C>(&self, call: alloy_contract::CallBuilder<&InnerProvider, C>) -> Result<TransactionReceipt, ChainGatewayError>
    where
        C: alloy_sol_types::SolCall,
    {
        match call.send().await {
            Ok(pending) => Ok(pending.get_receipt().await?),
            Err(err) => {
                self.nonce_manager.reset().await;
                Err(err.into())
            }
        }
    }

    /// Releases the underlying HTTP connection pool. Called during graceful
    /// shutdown (spec.md §9 "Global oracle signer").
    pub async fn shutdown(self: Arc<Self>) {
        tracing::info!("chain gateway shutting down");
    }
}
