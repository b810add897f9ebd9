//! Persistence for C4 (Reconciliation Engine): WMS snapshots, sync requests,
//! and the singleton sync state row (spec §3, §4.4).

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Row};

use crate::error::InventoryError;
use crate::models::{SyncRequest, SyncState, WmsSnapshot};

fn row_to_snapshot(row: sqlx::postgres::PgRow) -> Result<WmsSnapshot, InventoryError> {
    Ok(WmsSnapshot {
        id: row.try_get("id")?,
        wms_batch_id: row.try_get("wms_batch_id")?,
        batch_id: row.try_get("batch_id")?,
        reported_orderable: row.try_get("reported_orderable")?,
        reported_unallocatable: row.try_get("reported_unallocatable")?,
        reported_at: row.try_get("reported_at")?,
        raw_payload: row.try_get("raw_payload")?,
    })
}

/// Append-only audit row: one per returned WMS snapshot entry, regardless of
/// whether it resolves to a local batch (spec §4.4 step 3).
pub async fn insert_snapshot(
    conn: &mut PgConnection,
    wms_batch_id: &str,
    batch_id: Option<i64>,
    reported_orderable: i32,
    reported_unallocatable: Option<i32>,
    raw_payload: Value,
) -> Result<WmsSnapshot, InventoryError> {
    let row = sqlx::query(
        r#"
        insert into wms_snapshots
            (wms_batch_id, batch_id, reported_orderable, reported_unallocatable, raw_payload)
        values ($1, $2, $3, $4, $5)
        returning id, wms_batch_id, batch_id, reported_orderable, reported_unallocatable,
                  reported_at, raw_payload
        "#,
    )
    .bind(wms_batch_id)
    .bind(batch_id)
    .bind(reported_orderable)
    .bind(reported_unallocatable)
    .bind(raw_payload)
    .fetch_one(&mut *conn)
    .await?;

    row_to_snapshot(row)
}

fn row_to_sync_request(row: sqlx::postgres::PgRow) -> Result<SyncRequest, InventoryError> {
    Ok(SyncRequest {
        id: row.try_get("id")?,
        requested_by: row.try_get("requested_by")?,
        reason: row.try_get("reason")?,
        batch_id: row.try_get("batch_id")?,
        priority: row.try_get("priority")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        completed_at: row.try_get("completed_at")?,
        error: row.try_get("error")?,
    })
}

pub async fn insert_sync_request(
    pool: &PgPool,
    requested_by: &str,
    reason: &str,
    batch_id: Option<i64>,
    priority: i32,
) -> Result<SyncRequest, InventoryError> {
    let row = sqlx::query(
        r#"
        insert into sync_requests (requested_by, reason, batch_id, priority, status)
        values ($1, $2, $3, $4, 'PENDING')
        returning id, requested_by, reason, batch_id, priority, status,
                  created_at, updated_at, completed_at, error
        "#,
    )
    .bind(requested_by)
    .bind(reason)
    .bind(batch_id)
    .bind(priority)
    .fetch_one(pool)
    .await?;

    row_to_sync_request(row)
}

pub async fn fetch_sync_request(
    pool: &PgPool,
    id: i64,
) -> Result<Option<SyncRequest>, InventoryError> {
    let row = sqlx::query(
        r#"
        select id, requested_by, reason, batch_id, priority, status,
               created_at, updated_at, completed_at, error
        from sync_requests
        where id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    Ok(Some(row_to_sync_request(row)?))
}

pub async fn mark_sync_request_in_progress(
    pool: &PgPool,
    id: i64,
) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update sync_requests
        set status = 'IN_PROGRESS',
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_sync_request_done(pool: &PgPool, id: i64) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update sync_requests
        set status = 'DONE',
            completed_at = now(),
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_sync_request_failed(
    pool: &PgPool,
    id: i64,
    error: &str,
) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update sync_requests
        set status = 'FAILED',
            error = $2,
            completed_at = now(),
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_sync_state(pool: &PgPool) -> Result<SyncState, InventoryError> {
    let row = sqlx::query(
        r#"
        select last_full_sync_at, last_incremental_token
        from sync_state
        where id = 1
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(SyncState {
        last_full_sync_at: row.try_get("last_full_sync_at")?,
        last_incremental_token: row.try_get("last_incremental_token")?,
    })
}

pub async fn update_sync_state_full(
    pool: &PgPool,
    synced_at: DateTime<Utc>,
) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update sync_state
        set last_full_sync_at = $1
        where id = 1
        "#,
    )
    .bind(synced_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_sync_state_incremental_token(
    pool: &PgPool,
    token: &str,
) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update sync_state
        set last_incremental_token = $1
        where id = 1
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?;
    Ok(())
}
