//! inv-dispatcher entry point. Thin: load config, open the pool, hand off to
//! the drain loop in the library.

use anyhow::Context;
use inv_broker::InMemoryBroker;
use inv_config::DispatcherConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let db_config = inv_config::DbConfig::from_env()?;
    let dispatcher_config = DispatcherConfig::from_env()?;
    let pool = inv_db::connect(
        &db_config.url,
        db_config.min_connections,
        db_config.max_connections,
    )
    .await
    .context("failed to connect to Postgres")?;
    inv_db::migrate(&pool).await?;

    // Out-of-scope broker topology (spec §1) means there is no real AMQP
    // binding to wire up here; the in-memory adapter is the concrete
    // publisher this binary ships with. A real transport only needs to
    // implement `inv_broker::EventPublisher`.
    let publisher = InMemoryBroker::new();

    info!(
        batch_size = dispatcher_config.batch_size,
        poll_interval_ms = dispatcher_config.poll_interval_ms,
        "inv-dispatcher starting"
    );
    inv_dispatcher::run_forever(&pool, &publisher, dispatcher_config).await;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
