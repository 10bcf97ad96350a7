//! Structured logging setup. No OTLP exporter is wired up here — the ambient
//! dependency (`opentelemetry*`) the multi-chain facilitator this crate grew
//! from carries isn't needed for a single-service deployment, so this is the
//! teacher's local-logging fallback path generalized into the only path.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Call once, at process start.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
