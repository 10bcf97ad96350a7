//! PODx attestation & settlement core — HTTP entrypoint.
//!
//! This binary launches an Axum-based HTTP server exposing the signing-
//! session surface (spec.md §6):
//! - `POST /signing-sessions` – courier submits a signed milestone
//! - `GET /signing-sessions/{id}` – counterparty fetches typed data to sign
//! - `POST /signing-sessions/{id}/sign` – counterparty submits countersignature
//! - `GET /healthz` – liveness probe
//!
//! Startup sequence:
//! 1. Load `.env` and parse [`podx_core::config::Config`], failing fast on any
//!    missing required option (spec.md §7 `CONFIG`).
//! 2. Connect to Postgres and run embedded migrations.
//! 3. Connect the chain gateway, asserting the configured oracle signer
//!    matches `OrderRegistry.deliveryOracle()` (spec.md §4.7).
//! 4. Wire the session store, verifier, and settlement coordinator.
//! 5. Spawn the background sweep (session expiry + settlement recovery).
//! 6. Serve, with graceful shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::Router;
use tower_http::cors;
use tower_http::trace::TraceLayer;

use podx_core::chain::ChainGateway;
use podx_core::config::Config;
use podx_core::db;
use podx_core::handlers::{self, PodxState};
use podx_core::session::SessionStore;
use podx_core::settlement::recovery::RecoveryPass;
use podx_core::settlement::SettlementCoordinator;
use podx_core::sig_down::SigDown;
use podx_core::sweep;
use podx_core::telemetry;
use podx_core::verifier::Verifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    // `Config::load` handles the `.env` load itself, since it needs to run
    // before parsing (spec.md §7 `CONFIG`).
    let config = Config::load()?;

    let pool = db::connect(&config.database_url, config.database_max_connections).await?;
    db::migrate(&pool).await?;

    let oracle_signer = config.oracle_signer()?;
    let chain = Arc::new(
        ChainGateway::connect(config.rpc_url.clone(), config.chain_id, oracle_signer, config.contract_addresses()).await?,
    );

    let verifier = Arc::new(Verifier::new(chain.clone()));
    let session_secret = config.session_secret_bytes()?;
    let sessions = Arc::new(SessionStore::new(
        pool.clone(),
        session_secret,
        config.session_ttl_minutes,
        config.default_radius_meters,
        config.chain_id,
        config.verifying_contract(),
    ));
    let settlement = Arc::new(SettlementCoordinator::new(
        pool.clone(),
        chain.clone(),
        verifier.clone(),
        config.reward_per_meter,
    ));
    let recovery = Arc::new(RecoveryPass::new(pool.clone(), chain.clone()));

    let sig_down = SigDown::try_new()?;
    let cancellation_token = sig_down.cancellation_token();
    let sweep_tracker = sweep::spawn(sessions.clone(), recovery, Duration::from_secs(60), cancellation_token.clone());

    let state = Arc::new(PodxState {
        sessions,
        settlement,
        verifier,
        chain: chain.clone(),
    });

    let http_endpoints: Router = handlers::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(oracle = %chain.oracle_address(), chain_id = config.chain_id, "starting PODx core at http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap_or_else(|e| {
        tracing::error!("failed to bind to {addr}: {e}");
        std::process::exit(1);
    });

    let graceful_shutdown = {
        let cancellation_token = cancellation_token.clone();
        async move { cancellation_token.cancelled().await }
    };
    axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    sweep_tracker.wait().await;
    pool.close().await;
    Ok(())
}
