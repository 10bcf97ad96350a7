//! Postgres persistence layer: pool wiring, migrations, and one repository
//! module per entity in spec.md §3. Queries are written with `sqlx::query`/
//! `query_as` (not the `query!` compile-time macros, which need a live
//! `DATABASE_URL` at build time) and bind parameters explicitly.

pub mod magic_links;
pub mod models;
pub mod orders;
pub mod payments;
pub mod products;
pub mod proofs;
pub mod sessions;
pub mod shipments;

use sqlx::postgres::{PgPoolOptions, PgSslMode};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let options = sqlx::postgres::PgConnectOptions::from_str(database_url)?.ssl_mode(PgSslMode::Prefer);
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Runs embedded migrations. Fatal on failure, same posture the teacher takes
/// for an unreachable chain RPC at startup.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
