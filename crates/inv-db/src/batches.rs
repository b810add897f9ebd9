use std::collections::BTreeMap;

use sqlx::{PgConnection, Row};

use crate::error::InventoryError;
use crate::models::Batch;

fn row_to_batch(row: sqlx::postgres::PgRow) -> Result<Batch, InventoryError> {
    Ok(Batch {
        id: row.try_get("id")?,
        sku_id: row.try_get("sku_id")?,
        external_batch_id: row.try_get("external_batch_id")?,
        lot_number: row.try_get("lot_number")?,
        expires_at: row.try_get("expires_at")?,
        total_quantity: row.try_get("total_quantity")?,
        unallocatable_quantity: row.try_get("unallocatable_quantity")?,
        available_quantity: row.try_get("available_quantity")?,
        version: row.try_get("version")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Acquire an exclusive row lock on every batch in `batch_ids`, in a single
/// query ordered by `id` ascending. This is the deadlock-avoidance invariant
/// every writer (Reserve, Release, Adjust, Reconcile) must follow (spec §4.1
/// step 3, §5).
pub async fn lock_batches_ascending(
    conn: &mut PgConnection,
    batch_ids: &[i64],
) -> Result<BTreeMap<i64, Batch>, InventoryError> {
    let rows = sqlx::query(
        r#"
        select id, sku_id, external_batch_id, lot_number, expires_at,
               total_quantity, unallocatable_quantity, available_quantity,
               version, updated_at
        from batches
        where id = any($1)
        order by id asc
        for update
        "#,
    )
    .bind(batch_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut out = BTreeMap::new();
    for row in rows {
        let batch = row_to_batch(row)?;
        out.insert(batch.id, batch);
    }
    Ok(out)
}

/// Lock a single batch row, failing with `BATCH_NOT_FOUND` if it is absent.
pub async fn lock_batch(conn: &mut PgConnection, batch_id: i64) -> Result<Batch, InventoryError> {
    let row = sqlx::query(
        r#"
        select id, sku_id, external_batch_id, lot_number, expires_at,
               total_quantity, unallocatable_quantity, available_quantity,
               version, updated_at
        from batches
        where id = $1
        for update
        "#,
    )
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => row_to_batch(row),
        None => Err(InventoryError::BatchNotFound { batch_id }),
    }
}

/// Update `available_quantity` after the caller has already locked the row
/// and validated the new value against the store's invariants.
pub async fn set_available_quantity(
    conn: &mut PgConnection,
    batch_id: i64,
    new_available: i32,
) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update batches
        set available_quantity = $2,
            version = version + 1,
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(batch_id)
    .bind(new_available)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Read-only lookup, no row lock — used by readers that only need the
/// current row (e.g. the WMS outbound worker resolving `external_batch_id`).
pub async fn find_by_id(
    conn: &mut PgConnection,
    batch_id: i64,
) -> Result<Option<Batch>, InventoryError> {
    let row = sqlx::query(
        r#"
        select id, sku_id, external_batch_id, lot_number, expires_at,
               total_quantity, unallocatable_quantity, available_quantity,
               version, updated_at
        from batches
        where id = $1
        "#,
    )
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(row_to_batch).transpose()
}

/// Resolve a WMS-reported batch id back to a local row, read-only — used by
/// the reconciliation driver to decide whether a snapshot entry matches a
/// known batch before it locks anything (spec §4.4 step 3).
pub async fn find_by_external_id(
    conn: &mut PgConnection,
    external_batch_id: &str,
) -> Result<Option<Batch>, InventoryError> {
    let row = sqlx::query(
        r#"
        select id, sku_id, external_batch_id, lot_number, expires_at,
               total_quantity, unallocatable_quantity, available_quantity,
               version, updated_at
        from batches
        where external_batch_id = $1
        "#,
    )
    .bind(external_batch_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(row_to_batch).transpose()
}

pub async fn find_by_sku_id(
    conn: &mut PgConnection,
    sku_id: i64,
) -> Result<Vec<Batch>, InventoryError> {
    let rows = sqlx::query(
        r#"
        select id, sku_id, external_batch_id, lot_number, expires_at,
               total_quantity, unallocatable_quantity, available_quantity,
               version, updated_at
        from batches
        where sku_id = $1
        order by expires_at asc nulls last, id asc
        "#,
    )
    .bind(sku_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(row_to_batch).collect()
}
