//! Shared Postgres-backed test fixtures: connect using `INV_DATABASE_URL`,
//! run migrations, hand back a ready pool. Scenario tests across crates
//! build on these instead of hand-rolling inserts.

use anyhow::Result;
use sqlx::PgPool;

/// Connect using `INV_DATABASE_URL` and ensure migrations are applied.
pub async fn db_pool() -> Result<PgPool> {
    inv_db::testkit_db_pool().await
}

/// Insert a SKU fixture row, returning its id.
pub async fn insert_sku(pool: &PgPool, code: &str) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as("insert into skus (code) values ($1) returning id")
        .bind(code)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

/// Insert a batch fixture row with `available_quantity = total_quantity`
/// (no prior allocation), returning its id.
pub async fn insert_batch(pool: &PgPool, sku_id: i64, total_quantity: i32) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        insert into batches (sku_id, total_quantity, unallocatable_quantity, available_quantity)
        values ($1, $2, 0, $2)
        returning id
        "#,
    )
    .bind(sku_id)
    .bind(total_quantity)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Insert a batch fixture row with an explicit external id, for WMS-facing
/// scenarios (C3/C4).
pub async fn insert_batch_with_external_id(
    pool: &PgPool,
    sku_id: i64,
    total_quantity: i32,
    external_batch_id: &str,
) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        insert into batches (sku_id, external_batch_id, total_quantity, unallocatable_quantity, available_quantity)
        values ($1, $2, $3, 0, $3)
        returning id
        "#,
    )
    .bind(sku_id)
    .bind(external_batch_id)
    .bind(total_quantity)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Read back a batch's current `available_quantity`, for assertions.
pub async fn available_quantity(pool: &PgPool, batch_id: i64) -> Result<i32> {
    let (qty,): (i32,) = sqlx::query_as("select available_quantity from batches where id = $1")
        .bind(batch_id)
        .fetch_one(pool)
        .await?;
    Ok(qty)
}

/// Count reservation rows for an order, for assertions that don't need the
/// full row set.
pub async fn reservation_count_for_order(pool: &PgPool, order_id: &str) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("select count(*)::bigint from reservations where order_id = $1")
        .bind(order_id)
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Every reservation status for an order, in `batch_id` order — for
/// assertions on exact post-release/post-reserve state.
pub async fn reservation_statuses_for_order(pool: &PgPool, order_id: &str) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "select status from reservations where order_id = $1 order by batch_id asc",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(s,)| s).collect())
}

/// Count outbox rows of a given `type` for a single order, for assertions
/// that a scenario produced exactly the expected number of domain events.
/// Tests run concurrently against one shared database, so this is scoped to
/// `payload->>'orderId'` rather than counting the whole table.
pub async fn outbox_count_by_type_for_order(
    pool: &PgPool,
    event_type: &str,
    order_id: &str,
) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        "select count(*)::bigint from outbox_events where type = $1 and payload->>'orderId' = $2",
    )
    .bind(event_type)
    .bind(order_id)
    .fetch_one(pool)
    .await?;
    Ok(n)
}

/// Same as [`outbox_count_by_type_for_order`] but scoped to a batch, for
/// `InventoryAdjusted` events which carry `batchId` rather than `orderId`.
pub async fn outbox_count_by_type_for_batch(
    pool: &PgPool,
    event_type: &str,
    batch_id: i64,
) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        "select count(*)::bigint from outbox_events where type = $1 and (payload->>'batchId')::bigint = $2",
    )
    .bind(event_type)
    .bind(batch_id)
    .fetch_one(pool)
    .await?;
    Ok(n)
}

/// Sum of ledger deltas for a batch, for asserting invariant 1 (spec §8):
/// `availableQuantity = initialTotal + Σ ledger.quantityDelta`.
pub async fn ledger_delta_sum(pool: &PgPool, batch_id: i64) -> Result<i64> {
    let (sum,): (Option<i64>,) =
        sqlx::query_as("select sum(quantity_delta)::bigint from ledger_entries where batch_id = $1")
            .bind(batch_id)
            .fetch_one(pool)
            .await?;
    Ok(sum.unwrap_or(0))
}
