use serde_json::Value;
use sqlx::{PgConnection, PgPool, Row};

use crate::error::InventoryError;
use crate::models::OutboxEvent;

fn row_to_event(row: sqlx::postgres::PgRow) -> Result<OutboxEvent, InventoryError> {
    Ok(OutboxEvent {
        id: row.try_get("id")?,
        r#type: row.try_get("type")?,
        payload: row.try_get("payload")?,
        status: row.try_get("status")?,
        retry_count: row.try_get("retry_count")?,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a PENDING outbox row in the same transaction as the business
/// mutation it describes. A rollback anywhere upstream takes this row with
/// it — there is no path to a phantom event (spec §4.1, §8 invariant 5).
pub async fn insert(
    conn: &mut PgConnection,
    event_type: &str,
    payload: Value,
) -> Result<OutboxEvent, InventoryError> {
    let row = sqlx::query(
        r#"
        insert into outbox_events (type, payload, status)
        values ($1, $2, 'PENDING')
        returning id, type, payload, status, retry_count, error, created_at, updated_at
        "#,
    )
    .bind(event_type)
    .bind(payload)
    .fetch_one(&mut *conn)
    .await?;

    row_to_event(row)
}

/// Select up to `batch_size` PENDING rows ordered by `created_at`, taking an
/// exclusive skip-locked read. Must be called inside the dispatcher's own
/// transaction (spec §4.2 step 2): the row lock is held until that
/// transaction commits, so a second dispatcher's concurrent call skips these
/// rows rather than blocking on them.
pub async fn select_pending_for_dispatch(
    conn: &mut PgConnection,
    batch_size: i64,
) -> Result<Vec<OutboxEvent>, InventoryError> {
    let rows = sqlx::query(
        r#"
        select id, type, payload, status, retry_count, error, created_at, updated_at
        from outbox_events
        where status = 'PENDING'
        order by created_at asc
        limit $1
        for update skip locked
        "#,
    )
    .bind(batch_size)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(row_to_event).collect()
}

pub async fn mark_sent(conn: &mut PgConnection, id: i64) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update outbox_events
        set status = 'SENT',
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn mark_failed(
    conn: &mut PgConnection,
    id: i64,
    error: &str,
) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update outbox_events
        set status = 'FAILED',
            retry_count = retry_count + 1,
            error = $2,
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(id)
    .bind(error)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Operator action: reset a FAILED row back to PENDING so the dispatcher
/// picks it up again. The dispatcher itself never does this (spec §4.2
/// Failure policy).
pub async fn requeue_failed(pool: &PgPool, id: i64) -> Result<bool, InventoryError> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        update outbox_events
        set status = 'PENDING',
            updated_at = now()
        where id = $1 and status = 'FAILED'
        returning id
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn count_by_status(pool: &PgPool, status: &str) -> Result<i64, InventoryError> {
    let (n,): (i64,) = sqlx::query_as(
        r#"
        select count(*)::bigint
        from outbox_events
        where status = $1
        "#,
    )
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(n)
}
