//! Env-var configuration for the inventory services (spec §6.4). Each
//! setting is read by its own small function, in the style of
//! `inv_db::connect_from_env` — no file layering, no config hashing; this
//! system has no multi-environment YAML to reconcile, just a flat list of
//! recognized options.

use anyhow::{anyhow, Context, Result};

fn env_string(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("missing env var {name}"))
}

fn env_u32(name: &str, default: u32) -> Result<u32> {
    match std::env::var(name) {
        Ok(v) => v.parse::<u32>().with_context(|| format!("invalid {name}: {v}")),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(anyhow!("{name}: {e}")),
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(v) => v.parse::<usize>().with_context(|| format!("invalid {name}: {v}")),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(anyhow!("{name}: {e}")),
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub idle_timeout_ms: u32,
    pub connect_timeout_ms: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: env_string("INV_DATABASE_URL")?,
            min_connections: env_u32("INV_DB_POOL_MIN", 2)?,
            max_connections: env_u32("INV_DB_POOL_MAX", 10)?,
            idle_timeout_ms: env_u32("INV_DB_POOL_IDLE_TIMEOUT_MS", 600_000)?,
            connect_timeout_ms: env_u32("INV_DB_POOL_CONNECT_TIMEOUT_MS", 5_000)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
}

impl BrokerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self { url: env_string("INV_BROKER_URL")? })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub batch_size: i64,
    pub poll_interval_ms: u64,
}

impl DispatcherConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            batch_size: env_u32("INV_DISPATCHER_BATCH_SIZE", 100)? as i64,
            poll_interval_ms: env_u32("INV_DISPATCHER_POLL_INTERVAL_MS", 200)? as u64,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub wms_outbound_prefetch: usize,
    pub sync_prefetch: usize,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            wms_outbound_prefetch: env_usize("INV_WMS_OUTBOUND_PREFETCH", 10)?,
            sync_prefetch: env_usize("INV_SYNC_PREFETCH", 5)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmsClientMode {
    Mock,
    Http,
}

impl WmsClientMode {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "mock" => Ok(WmsClientMode::Mock),
            "http" => Ok(WmsClientMode::Http),
            other => Err(anyhow!("invalid INV_WMS_CLIENT_MODE: {other} (expected mock|http)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WmsClientConfig {
    pub mode: WmsClientMode,
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl WmsClientConfig {
    pub fn from_env() -> Result<Self> {
        let mode = match std::env::var("INV_WMS_CLIENT_MODE") {
            Ok(v) => WmsClientMode::parse(&v)?,
            Err(_) => WmsClientMode::Mock,
        };

        let (url, api_key) = match mode {
            WmsClientMode::Mock => (None, None),
            WmsClientMode::Http => (
                Some(env_string("INV_WMS_URL")?),
                Some(env_string("INV_WMS_API_KEY")?),
            ),
        };

        Ok(Self { mode, url, api_key })
    }
}
