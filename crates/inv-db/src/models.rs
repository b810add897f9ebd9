//! Row types for the core tables (spec §3). All timestamps are `timestamptz`
//! columns surfaced as `DateTime<Utc>`.

use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Sku {
    pub id: i64,
    pub code: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub id: i64,
    pub sku_id: i64,
    pub external_batch_id: Option<String>,
    pub lot_number: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub total_quantity: i32,
    pub unallocatable_quantity: i32,
    pub available_quantity: i32,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntryType {
    Receipt,
    OrderAllocate,
    OrderRelease,
    Adjustment,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Receipt => "RECEIPT",
            LedgerEntryType::OrderAllocate => "ORDER_ALLOCATE",
            LedgerEntryType::OrderRelease => "ORDER_RELEASE",
            LedgerEntryType::Adjustment => "ADJUSTMENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerSource {
    NabisOrder,
    WmsSync,
    ManualAdjustment,
    WmsOutbound,
}

impl LedgerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerSource::NabisOrder => "NABIS_ORDER",
            LedgerSource::WmsSync => "WMS_SYNC",
            LedgerSource::ManualAdjustment => "MANUAL_ADJUSTMENT",
            LedgerSource::WmsOutbound => "WMS_OUTBOUND",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: i64,
    pub batch_id: i64,
    pub r#type: String,
    pub quantity_delta: i32,
    pub source: String,
    pub reference_id: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Expired => "EXPIRED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: i64,
    pub order_id: String,
    pub batch_id: i64,
    pub quantity: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Sent => "SENT",
            OutboxStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: i64,
    pub r#type: String,
    pub payload: Value,
    pub status: String,
    pub retry_count: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WmsSnapshot {
    pub id: i64,
    pub wms_batch_id: String,
    pub batch_id: Option<i64>,
    pub reported_orderable: i32,
    pub reported_unallocatable: Option<i32>,
    pub reported_at: DateTime<Utc>,
    pub raw_payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequestStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl SyncRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRequestStatus::Pending => "PENDING",
            SyncRequestStatus::InProgress => "IN_PROGRESS",
            SyncRequestStatus::Done => "DONE",
            SyncRequestStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub id: i64,
    pub requested_by: String,
    pub reason: String,
    pub batch_id: Option<i64>,
    pub priority: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SyncState {
    pub last_full_sync_at: Option<DateTime<Utc>>,
    pub last_incremental_token: Option<String>,
}
