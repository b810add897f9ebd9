use serde_json::Value;
use sqlx::{PgConnection, Row};

use crate::error::InventoryError;
use crate::models::LedgerEntry;

#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub batch_id: i64,
    pub r#type: &'static str,
    pub quantity_delta: i32,
    pub source: &'static str,
    pub reference_id: Option<&'a str>,
    pub metadata: Option<Value>,
}

/// Append one ledger row. The ledger is append-only: this is the only write
/// path, there is no update/delete (spec §3).
pub async fn append(
    conn: &mut PgConnection,
    entry: NewLedgerEntry<'_>,
) -> Result<LedgerEntry, InventoryError> {
    let row = sqlx::query(
        r#"
        insert into ledger_entries (batch_id, type, quantity_delta, source, reference_id, metadata)
        values ($1, $2, $3, $4, $5, $6)
        returning id, batch_id, type, quantity_delta, source, reference_id, metadata, created_at
        "#,
    )
    .bind(entry.batch_id)
    .bind(entry.r#type)
    .bind(entry.quantity_delta)
    .bind(entry.source)
    .bind(entry.reference_id)
    .bind(entry.metadata)
    .fetch_one(&mut *conn)
    .await?;

    Ok(LedgerEntry {
        id: row.try_get("id")?,
        batch_id: row.try_get("batch_id")?,
        r#type: row.try_get("type")?,
        quantity_delta: row.try_get("quantity_delta")?,
        source: row.try_get("source")?,
        reference_id: row.try_get("reference_id")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Sum of all ledger deltas for a batch — used by tests asserting the
/// ledger-is-sum-source-of-truth invariant (spec §8 invariant 1).
pub async fn sum_deltas_for_batch(
    conn: &mut PgConnection,
    batch_id: i64,
) -> Result<i64, InventoryError> {
    let (sum,): (Option<i64>,) = sqlx::query_as(
        r#"
        select sum(quantity_delta)::bigint
        from ledger_entries
        where batch_id = $1
        "#,
    )
    .bind(batch_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(sum.unwrap_or(0))
}
