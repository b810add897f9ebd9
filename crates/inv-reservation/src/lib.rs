//! C1, the Reservation Engine — the hardest algorithm in the system (spec
//! §4.1). `reserve`/`release`/`adjust` each take an already-open transaction
//! handle from the caller; the caller commits on success and rolls back on
//! any returned error. A rollback anywhere leaves no visible state,
//! including no outbox event (spec §4.1, §8 invariant 5).

use std::collections::BTreeSet;

use chrono::Utc;
use inv_db::error::InventoryError;
use inv_db::models::ReservationStatus;
use inv_db::{batches, ledger, outbox, reservations};
use inv_schemas::{InventoryAdjusted, InventoryAllocated, InventoryReleased};
use sqlx::PgConnection;

#[derive(Debug, Clone, Copy)]
pub struct ReserveLine {
    pub batch_id: i64,
    pub quantity: i32,
}

/// Reserve inventory against one or more batches for `order_id` (spec §4.1
/// Reserve protocol). A second call with an identical `lines` multiset is a
/// no-op that returns success (idempotence law, spec §8).
pub async fn reserve(
    conn: &mut PgConnection,
    order_id: &str,
    lines: &[ReserveLine],
) -> Result<(), InventoryError> {
    // Step 1: idempotency probe, before any locks.
    let existing = reservations::find_by_order_id(conn, order_id).await?;
    if !existing.is_empty() {
        if lines_match_existing(lines, &existing) {
            return Ok(());
        }
        return Err(InventoryError::OrderAlreadyReserved { order_id: order_id.to_string() });
    }

    // Step 2: input validation.
    if lines.is_empty() {
        return Err(InventoryError::InvalidQuantity {
            message: "lines must be non-empty".to_string(),
        });
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(InventoryError::InvalidQuantity {
                message: format!("quantity must be > 0, got {}", line.quantity),
            });
        }
    }

    // Step 3: deterministic lock acquisition, ascending batch_id order.
    let batch_ids: Vec<i64> = lines.iter().map(|l| l.batch_id).collect::<BTreeSet<_>>().into_iter().collect();
    let mut locked = batches::lock_batches_ascending(conn, &batch_ids).await?;

    // Step 4: inventory check.
    for line in lines {
        match locked.get(&line.batch_id) {
            None => return Err(InventoryError::BatchNotFound { batch_id: line.batch_id }),
            Some(batch) if batch.available_quantity < line.quantity => {
                return Err(InventoryError::InsufficientInventory {
                    batch_id: line.batch_id,
                    requested: line.quantity,
                    available: batch.available_quantity,
                });
            }
            Some(_) => {}
        }
    }

    // Step 5: apply, in input order.
    let timestamp = Utc::now();
    for line in lines {
        let batch = locked.get_mut(&line.batch_id).expect("checked present in step 4");
        let new_available = batch.available_quantity - line.quantity;
        batches::set_available_quantity(conn, line.batch_id, new_available).await?;
        batch.available_quantity = new_available;

        ledger::append(
            conn,
            ledger::NewLedgerEntry {
                batch_id: line.batch_id,
                r#type: "ORDER_ALLOCATE",
                quantity_delta: -line.quantity,
                source: "NABIS_ORDER",
                reference_id: Some(order_id),
                metadata: None,
            },
        )
        .await?;

        reservations::insert_pending(conn, order_id, line.batch_id, line.quantity).await?;

        let event = InventoryAllocated {
            order_id: order_id.to_string(),
            batch_id: line.batch_id,
            quantity: line.quantity,
            reason: None,
            timestamp,
        };
        outbox::insert(conn, "InventoryAllocated", serde_json::to_value(event)?).await?;
    }

    Ok(())
}

/// The idempotency probe's matching rule (spec §4.1 step 1): the existing
/// rows must exactly match the requested lines as an unordered multiset
/// keyed by `batch_id` with identical quantities. Any `CANCELLED` row is an
/// automatic mismatch regardless of quantity — a prior release means this is
/// a fresh attempt, not a repeat of the original request (see DESIGN.md Open
/// Questions).
fn lines_match_existing(
    lines: &[ReserveLine],
    existing: &[inv_db::models::Reservation],
) -> bool {
    if lines.len() != existing.len() {
        return false;
    }
    if existing.iter().any(|r| r.status == ReservationStatus::Cancelled.as_str()) {
        return false;
    }

    let mut requested: Vec<(i64, i32)> = lines.iter().map(|l| (l.batch_id, l.quantity)).collect();
    let mut actual: Vec<(i64, i32)> = existing.iter().map(|r| (r.batch_id, r.quantity)).collect();
    requested.sort_unstable();
    actual.sort_unstable();
    requested == actual
}

/// Release all PENDING reservations for `order_id` (spec §4.1 Release
/// protocol). A second call after a successful release returns success
/// idempotently (spec §8).
pub async fn release(
    conn: &mut PgConnection,
    order_id: &str,
    reason: Option<&str>,
) -> Result<(), InventoryError> {
    let pending = reservations::lock_pending_by_order_id(conn, order_id).await?;

    if pending.is_empty() {
        let any = reservations::find_by_order_id(conn, order_id).await?;
        if any.is_empty() {
            return Err(InventoryError::OrderNotFound { order_id: order_id.to_string() });
        }
        return Ok(());
    }

    // pending is already ordered by batch_id ascending; lock those batch rows
    // in the same order.
    let batch_ids: Vec<i64> = pending.iter().map(|r| r.batch_id).collect();
    let mut locked = batches::lock_batches_ascending(conn, &batch_ids).await?;

    let timestamp = Utc::now();
    for reservation in &pending {
        let batch = locked
            .get_mut(&reservation.batch_id)
            .ok_or(InventoryError::BatchNotFound { batch_id: reservation.batch_id })?;
        let new_available = batch.available_quantity + reservation.quantity;
        batches::set_available_quantity(conn, reservation.batch_id, new_available).await?;
        batch.available_quantity = new_available;

        ledger::append(
            conn,
            ledger::NewLedgerEntry {
                batch_id: reservation.batch_id,
                r#type: "ORDER_RELEASE",
                quantity_delta: reservation.quantity,
                source: "NABIS_ORDER",
                reference_id: Some(order_id),
                metadata: None,
            },
        )
        .await?;

        reservations::cancel(conn, reservation.id).await?;

        let event = InventoryReleased {
            order_id: order_id.to_string(),
            batch_id: reservation.batch_id,
            quantity: reservation.quantity,
            reason: reason.map(str::to_string),
            timestamp,
        };
        outbox::insert(conn, "InventoryReleased", serde_json::to_value(event)?).await?;
    }

    Ok(())
}

/// Apply a signed adjustment to a batch's available quantity (spec §4.1
/// Adjust protocol). Not idempotent — every call adds its delta.
pub async fn adjust(
    conn: &mut PgConnection,
    batch_id: i64,
    delta: i32,
    reason: &str,
) -> Result<i32, InventoryError> {
    let batch = batches::lock_batch(conn, batch_id).await?;
    let new_available = batch.available_quantity + delta;
    if new_available < 0 || new_available > batch.total_quantity {
        return Err(InventoryError::InvalidQuantity {
            message: format!(
                "adjustment would set available to {new_available}, outside [0, {}]",
                batch.total_quantity
            ),
        });
    }

    batches::set_available_quantity(conn, batch_id, new_available).await?;

    ledger::append(
        conn,
        ledger::NewLedgerEntry {
            batch_id,
            r#type: "ADJUSTMENT",
            quantity_delta: delta,
            source: "MANUAL_ADJUSTMENT",
            reference_id: None,
            metadata: Some(serde_json::json!({ "reason": reason })),
        },
    )
    .await?;

    let timestamp = Utc::now();
    let event = InventoryAdjusted {
        batch_id,
        quantity_delta: delta,
        new_available,
        source: "MANUAL_ADJUSTMENT".to_string(),
        reason: Some(reason.to_string()),
        timestamp,
    };
    outbox::insert(conn, "InventoryAdjusted", serde_json::to_value(event)?).await?;

    Ok(new_available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inv_db::models::{Reservation, ReservationStatus};
    use chrono::Utc as ChronoUtc;

    fn fake_reservation(batch_id: i64, quantity: i32, status: ReservationStatus) -> Reservation {
        Reservation {
            id: 1,
            order_id: "O1".to_string(),
            batch_id,
            quantity,
            status: status.as_str().to_string(),
            created_at: ChronoUtc::now(),
            updated_at: ChronoUtc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn identical_multiset_matches_regardless_of_order() {
        let lines = [
            ReserveLine { batch_id: 2, quantity: 5 },
            ReserveLine { batch_id: 1, quantity: 10 },
        ];
        let existing = vec![
            fake_reservation(1, 10, ReservationStatus::Pending),
            fake_reservation(2, 5, ReservationStatus::Confirmed),
        ];
        assert!(lines_match_existing(&lines, &existing));
    }

    #[test]
    fn different_quantity_does_not_match() {
        let lines = [ReserveLine { batch_id: 1, quantity: 10 }];
        let existing = vec![fake_reservation(1, 20, ReservationStatus::Pending)];
        assert!(!lines_match_existing(&lines, &existing));
    }

    #[test]
    fn cancelled_existing_row_is_always_a_mismatch() {
        // Same batch_id/quantity as the request, but CANCELLED: a prior
        // release happened, so this must not be treated as a repeat of the
        // original request.
        let lines = [ReserveLine { batch_id: 1, quantity: 10 }];
        let existing = vec![fake_reservation(1, 10, ReservationStatus::Cancelled)];
        assert!(!lines_match_existing(&lines, &existing));
    }

    #[test]
    fn extra_existing_line_does_not_match() {
        let lines = [ReserveLine { batch_id: 1, quantity: 10 }];
        let existing = vec![
            fake_reservation(1, 10, ReservationStatus::Pending),
            fake_reservation(2, 5, ReservationStatus::Pending),
        ];
        assert!(!lines_match_existing(&lines, &existing));
    }
}
