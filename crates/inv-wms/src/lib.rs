//! C3, the WMS Outbound Worker (spec §4.3): mirrors allocation/release
//! events into the external warehouse management system.

pub mod client;
pub mod worker;

pub use client::{
    HttpWmsClient, MockWmsClient, SyncPage, SyncScope, WmsCallError, WmsClient, WmsResponseClass,
    WmsSnapshotResponse,
};
pub use worker::{run_once, WorkerStats};
