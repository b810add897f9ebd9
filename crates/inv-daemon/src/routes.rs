//! Axum router and all HTTP handlers for inv-daemon (spec §6.2).
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are thin: deserialize, call into
//! `inv-reservation`/`inv-db`/`inv-broker`, map the returned `InventoryError`
//! to an HTTP status through the single `ApiError` choke point.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use inv_broker::CommandPublisher;
use inv_db::error::InventoryError;
use inv_reservation::ReserveLine;
use inv_schemas::ForceWmsSync;

use crate::{
    api_types::{
        AdjustRequest, AdjustResponse, BatchView, ErrorResponse, HealthResponse,
        InventoryViewResponse, OrderStatusResponse, ReleaseRequest, ReserveRequest,
        WmsSyncQueuedResponse, WmsSyncRequest, WmsSyncStatusResponse,
    },
    state::AppState,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/inventory/reserve", post(reserve))
        .route("/inventory/release", post(release))
        .route("/inventory/:sku", get(inventory_for_sku))
        .route("/admin/wms/sync", post(admin_wms_sync))
        .route("/admin/wms/sync/:id", get(admin_wms_sync_status))
        .route("/admin/inventory/adjust", post(admin_inventory_adjust))
        .with_state(state)
}

/// Wraps `InventoryError` so this crate can implement a foreign trait
/// (`IntoResponse`) for it without violating the orphan rule.
struct ApiError(InventoryError);

impl From<InventoryError> for ApiError {
    fn from(e: InventoryError) -> Self {
        ApiError(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError(InventoryError::from(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.0.code().to_string(), message: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}

async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { ok: true, service: st.build.service, version: st.build.version }))
}

async fn reserve(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ReserveRequest>,
) -> Result<Response, ApiError> {
    let lines: Vec<ReserveLine> =
        req.lines.iter().map(|l| ReserveLine { batch_id: l.batch_id, quantity: l.quantity }).collect();

    let mut tx = st.pool.begin().await?;
    inv_reservation::reserve(&mut tx, &req.order_id, &lines).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(OrderStatusResponse { status: "ok", order_id: req.order_id })).into_response())
}

async fn release(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ReleaseRequest>,
) -> Result<Response, ApiError> {
    let mut tx = st.pool.begin().await?;
    inv_reservation::release(&mut tx, &req.order_id, req.reason.as_deref()).await?;
    tx.commit().await?;

    Ok((StatusCode::OK, Json(OrderStatusResponse { status: "ok", order_id: req.order_id })).into_response())
}

async fn inventory_for_sku(
    State(st): State<Arc<AppState>>,
    Path(sku): Path<String>,
) -> Result<Response, ApiError> {
    let inventory = inv_db::query::available_inventory(&st.pool, &sku).await?;

    let Some(inventory) = inventory else {
        let body = ErrorResponse { error: "SKU_NOT_FOUND".to_string(), message: format!("unknown sku: {sku}") };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    };

    let total_available = inventory.total_available();
    let batches = inventory
        .batches
        .iter()
        .map(|b| BatchView {
            batch_id: b.id,
            external_batch_id: b.external_batch_id.clone(),
            lot_number: b.lot_number.clone(),
            expires_at: b.expires_at,
            available_quantity: b.available_quantity,
            total_quantity: b.total_quantity,
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(InventoryViewResponse { sku_code: inventory.sku.code, total_available, batches }),
    )
        .into_response())
}

async fn admin_wms_sync(
    State(st): State<Arc<AppState>>,
    Json(req): Json<WmsSyncRequest>,
) -> Result<Response, ApiError> {
    let reason = req.reason.unwrap_or_else(|| "operator-requested sync".to_string());
    let sync_request =
        inv_db::wms::insert_sync_request(&st.pool, "http-api", &reason, req.batch_id, 0).await?;

    st.broker
        .publish_sync_command(ForceWmsSync { sync_request_id: sync_request.id, batch_id: req.batch_id })
        .await
        .map_err(|e| ApiError(InventoryError::Internal(anyhow::anyhow!(e.0))))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(WmsSyncQueuedResponse { request_id: sync_request.id, status: "queued" }),
    )
        .into_response())
}

async fn admin_wms_sync_status(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let sync_request = inv_db::wms::fetch_sync_request(&st.pool, id).await?;

    let Some(sync_request) = sync_request else {
        let body = ErrorResponse { error: "NOT_FOUND".to_string(), message: format!("no sync request {id}") };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    };

    Ok((
        StatusCode::OK,
        Json(WmsSyncStatusResponse {
            request_id: sync_request.id,
            status: sync_request.status,
            batch_id: sync_request.batch_id,
            reason: sync_request.reason,
            error: sync_request.error,
            completed_at: sync_request.completed_at,
        }),
    )
        .into_response())
}

async fn admin_inventory_adjust(
    State(st): State<Arc<AppState>>,
    Json(req): Json<AdjustRequest>,
) -> Result<Response, ApiError> {
    let mut tx = st.pool.begin().await?;
    let new_available = inv_reservation::adjust(&mut tx, req.batch_id, req.quantity_delta, &req.reason).await?;
    tx.commit().await?;

    Ok((StatusCode::OK, Json(AdjustResponse { status: "ok", new_available_quantity: new_available })).into_response())
}
