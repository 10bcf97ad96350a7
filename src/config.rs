//! Server configuration, loaded from environment variables (with an optional
//! `.env` file) via `clap`'s `env` feature. Unlike the multi-chain facilitator
//! this crate started from, a PODx deployment talks to exactly one chain and
//! one set of contracts, so configuration is flat: one `Config::parse()` call
//! rather than a JSON file plus `LiteralOrEnv` indirection.

use std::net::{IpAddr, Ipv4Addr};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use clap::Parser;
use url::Url;

use crate::chain::gateway::ContractAddresses;
use crate::error::PodxError;

#[derive(Parser, Debug)]
#[command(name = "podx-core")]
#[command(about = "PODx attestation and settlement server")]
pub struct Config {
    /// HTTP listen port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// HTTP listen address.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum size of the Postgres connection pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    /// EVM JSON-RPC endpoint the chain gateway connects to.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Url,

    /// Chain id of the network `rpc_url` points at.
    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: u64,

    /// Hex-encoded private key for the delivery oracle signer. Never logged.
    #[arg(long, env = "ORACLE_PRIVATE_KEY")]
    pub oracle_private_key: String,

    /// Settlement token (ERC-20) address.
    #[arg(long, env = "TOKEN_ADDRESS")]
    pub token_address: Address,

    /// Escrow contract address.
    #[arg(long, env = "ESCROW_ADDRESS")]
    pub escrow_address: Address,

    /// Order registry contract address.
    #[arg(long, env = "ORDER_REGISTRY_ADDRESS")]
    pub order_registry_address: Address,

    /// Shipment registry contract address — also the EIP-712 verifying
    /// contract for pickup/drop approvals.
    #[arg(long, env = "SHIPMENT_REGISTRY_ADDRESS")]
    pub shipment_registry_address: Address,

    /// Hex-encoded HMAC secret for magic-link tokens. Must decode to at least
    /// 32 bytes (spec.md §4.2 "Capability tokens").
    #[arg(long, env = "SESSION_SECRET")]
    pub session_secret: String,

    /// Minutes a signing session stays open before it is reaped.
    #[arg(long, env = "SESSION_TTL_MINUTES", default_value_t = 10)]
    pub session_ttl_minutes: i64,

    /// Default geofence radius in meters for pickup/drop location checks.
    #[arg(long, env = "DEFAULT_RADIUS_METERS", default_value_t = 2_000)]
    pub default_radius_meters: u32,

    /// Courier reward in wei per meter travelled, used when the registry
    /// doesn't emit an explicit `courierReward` (spec.md §4.6 step 4).
    #[arg(long, env = "REWARD_PER_METER", default_value_t = 10)]
    pub reward_per_meter: u64,
}

impl Config {
    /// Parses configuration from the process environment (and `.env` if
    /// present), failing fast on anything missing or malformed rather than
    /// starting the server into a half-configured state.
    pub fn load() -> Result<Self, PodxError> {
        let _ = dotenvy::dotenv();
        let config = Config::try_parse().map_err(|e| PodxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PodxError> {
        if self.session_secret_bytes()?.len() < 32 {
            return Err(PodxError::Config("SESSION_SECRET must decode to at least 32 bytes".into()));
        }
        Ok(())
    }

    pub fn session_secret_bytes(&self) -> Result<Vec<u8>, PodxError> {
        hex::decode(self.session_secret.trim_start_matches("0x")).map_err(|e| PodxError::Config(format!("SESSION_SECRET: {e}")))
    }

    pub fn oracle_signer(&self) -> Result<PrivateKeySigner, PodxError> {
        self.oracle_private_key
            .parse()
            .map_err(|e| PodxError::Config(format!("ORACLE_PRIVATE_KEY: {e}")))
    }

    pub fn verifying_contract(&self) -> Address {
        self.shipment_registry_address
    }

    pub fn contract_addresses(&self) -> ContractAddresses {
        ContractAddresses {
            token: self.token_address,
            escrow: self.escrow_address,
            order_registry: self.order_registry_address,
            shipment_registry: self.shipment_registry_address,
        }
    }
}
