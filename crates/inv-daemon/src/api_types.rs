//! Request and response types for all inv-daemon HTTP endpoints (spec §6.2).
//! No business logic lives here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

/// The single error shape every non-2xx response uses (spec §7's
/// `{code, status, message}` projection, minus the redundant status since
/// that's already the HTTP status line).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// POST /inventory/reserve
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveLineRequest {
    pub batch_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub order_id: String,
    pub lines: Vec<ReserveLineRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub status: &'static str,
    pub order_id: String,
}

// ---------------------------------------------------------------------------
// POST /inventory/release
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    pub order_id: String,
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /inventory/:sku
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    pub batch_id: i64,
    pub external_batch_id: Option<String>,
    pub lot_number: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub available_quantity: i32,
    pub total_quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryViewResponse {
    pub sku_code: String,
    pub total_available: i64,
    pub batches: Vec<BatchView>,
}

// ---------------------------------------------------------------------------
// POST /admin/wms/sync
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WmsSyncRequest {
    pub batch_id: Option<i64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WmsSyncQueuedResponse {
    pub request_id: i64,
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// GET /admin/wms/sync/:id
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WmsSyncStatusResponse {
    pub request_id: i64,
    pub status: String,
    pub batch_id: Option<i64>,
    pub reason: String,
    pub error: Option<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

// ---------------------------------------------------------------------------
// POST /admin/inventory/adjust
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    pub batch_id: i64,
    pub quantity_delta: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustResponse {
    pub status: &'static str,
    pub new_available_quantity: i32,
}
