//! inv-reconcile entry point: drains `ForceWmsSync` commands forever.
//!
//! Thin by design — wiring lives here, the protocol lives in `driver.rs`.

use anyhow::Context;
use inv_wms::{HttpWmsClient, MockWmsClient, WmsClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let db_config = inv_config::DbConfig::from_env()?;
    let pool =
        inv_db::connect(&db_config.url, db_config.min_connections, db_config.max_connections)
            .await
            .context("failed to connect to Postgres")?;
    inv_db::migrate(&pool).await?;

    let worker_config = inv_config::WorkerConfig::from_env()?;
    let wms_config = inv_config::WmsClientConfig::from_env()?;

    // The real broker binding is out of scope (spec §6.3); this process
    // shares the same in-memory broker instance a real deployment would
    // replace with a binding that implements `SyncCommandConsumer`.
    let broker = inv_broker::InMemoryBroker::new();

    let client: Box<dyn WmsClient> = match wms_config.mode {
        inv_config::WmsClientMode::Mock => Box::new(MockWmsClient::new()),
        inv_config::WmsClientMode::Http => Box::new(HttpWmsClient::new(
            wms_config.url.context("INV_WMS_URL required in http mode")?,
            wms_config.api_key.context("INV_WMS_API_KEY required in http mode")?,
        )),
    };

    tracing::info!("inv-reconcile polling for ForceWmsSync commands");
    inv_reconcile::driver::run_forever(
        &pool,
        &broker,
        client.as_ref(),
        worker_config.sync_prefetch,
        200,
    )
    .await;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
