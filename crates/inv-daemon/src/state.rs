//! Shared runtime state for inv-daemon. Owns the one pool and the one
//! broker handle; handlers never reach for ambient globals (spec §9's
//! explicit-lifecycle design note).

use std::sync::Arc;

use inv_broker::InMemoryBroker;
use sqlx::PgPool;

/// Static build metadata included in the health response.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Out-of-scope broker topology (spec §6.3) means the only concrete
    /// binding this binary ships with is the in-memory adapter; a real
    /// transport only needs `EventPublisher`/`CommandPublisher`.
    pub broker: Arc<InMemoryBroker>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            broker: Arc::new(InMemoryBroker::new()),
            build: BuildInfo { service: "inv-daemon", version: env!("CARGO_PKG_VERSION") },
        }
    }
}
