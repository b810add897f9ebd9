use sqlx::{PgConnection, Row};

use crate::error::InventoryError;
use crate::models::Reservation;

fn row_to_reservation(row: sqlx::postgres::PgRow) -> Result<Reservation, InventoryError> {
    Ok(Reservation {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        batch_id: row.try_get("batch_id")?,
        quantity: row.try_get("quantity")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

/// The idempotency probe (spec §4.1 step 1): every reservation row for
/// `order_id`, in no particular order, regardless of status. Does not lock —
/// it runs before any lock is acquired.
pub async fn find_by_order_id(
    conn: &mut PgConnection,
    order_id: &str,
) -> Result<Vec<Reservation>, InventoryError> {
    let rows = sqlx::query(
        r#"
        select id, order_id, batch_id, quantity, status, created_at, updated_at, expires_at
        from reservations
        where order_id = $1
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(row_to_reservation).collect()
}

/// PENDING reservations for `order_id`, locked and ordered by `batch_id`
/// ascending (spec §4.1 Release step 1 — this is where Release derives its
/// lock order from).
pub async fn lock_pending_by_order_id(
    conn: &mut PgConnection,
    order_id: &str,
) -> Result<Vec<Reservation>, InventoryError> {
    let rows = sqlx::query(
        r#"
        select id, order_id, batch_id, quantity, status, created_at, updated_at, expires_at
        from reservations
        where order_id = $1 and status = 'PENDING'
        order by batch_id asc
        for update
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(row_to_reservation).collect()
}

pub async fn insert_pending(
    conn: &mut PgConnection,
    order_id: &str,
    batch_id: i64,
    quantity: i32,
) -> Result<Reservation, InventoryError> {
    let row = sqlx::query(
        r#"
        insert into reservations (order_id, batch_id, quantity, status)
        values ($1, $2, $3, 'PENDING')
        returning id, order_id, batch_id, quantity, status, created_at, updated_at, expires_at
        "#,
    )
    .bind(order_id)
    .bind(batch_id)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;

    row_to_reservation(row)
}

pub async fn cancel(conn: &mut PgConnection, reservation_id: i64) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        update reservations
        set status = 'CANCELLED',
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(reservation_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
