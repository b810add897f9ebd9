//! Connection pool, migrations, and table access for the inventory
//! consistency engine. This crate owns the single relational store of
//! record (spec §2, §3) and the business error taxonomy (spec §7); every
//! other crate in the workspace builds on top of it.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub const ENV_DB_URL: &str = "INV_DATABASE_URL";

pub mod error;
pub mod models;

pub mod batches;
pub mod ledger;
pub mod outbox;
pub mod query;
pub mod reservations;
pub mod skus;
pub mod wms;

pub use error::InventoryError;

/// Connect to Postgres using `INV_DATABASE_URL`. Pool sizing is read from the
/// `INV_DB_POOL_*` variables by `inv-config`; this function takes bounds
/// directly so callers outside the daemon (dispatcher, workers, tests) don't
/// have to depend on `inv-config` just to open a pool.
pub async fn connect(url: &str, min_connections: u32, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, 2, 10).await
}

/// Run the embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Test/dev helper: connect using `INV_DATABASE_URL` and ensure migrations
/// are applied.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}
