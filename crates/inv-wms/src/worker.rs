//! The WMS outbound worker (spec §4.3): consumes `InventoryAllocated` /
//! `InventoryReleased` domain events and mirrors them into the WMS.

use inv_broker::EventConsumer;
use inv_db::ledger;
use inv_schemas::{InventoryAllocated, InventoryReleased};
use sqlx::PgPool;
use tracing::warn;

use crate::client::{WmsCallError, WmsClient, WmsResponseClass};

#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerStats {
    pub acked: u32,
    pub requeued: u32,
    pub dead_lettered: u32,
}

/// Drain up to `prefetch` deliveries once (spec §4.3). Each delivery is
/// acked on success, nack-requeued on a retriable WMS error, and
/// nack-to-dead-letter on anything else (unknown event type, unparseable
/// payload, missing batch, or a non-retriable WMS error).
pub async fn run_once(
    pool: &PgPool,
    consumer: &dyn EventConsumer,
    client: &dyn WmsClient,
    prefetch: usize,
) -> Result<WorkerStats, anyhow::Error> {
    let mut stats = WorkerStats::default();

    for delivery in consumer.poll(prefetch).await {
        let outcome = match delivery.event_type.as_str() {
            "InventoryAllocated" => handle_allocated(pool, client, delivery.payload.clone()).await,
            "InventoryReleased" => handle_released(pool, client, delivery.payload.clone()).await,
            other => {
                warn!(event_type = other, "unknown event type on wms outbound queue");
                Outcome::DeadLetter
            }
        };

        match outcome {
            Outcome::Ack => {
                consumer.ack(&delivery.delivery_tag).await;
                stats.acked += 1;
            }
            Outcome::Requeue => {
                consumer.nack_requeue(&delivery.delivery_tag).await;
                stats.requeued += 1;
            }
            Outcome::DeadLetter => {
                consumer.nack_dead_letter(&delivery.delivery_tag).await;
                stats.dead_lettered += 1;
            }
        }
    }

    Ok(stats)
}

enum Outcome {
    Ack,
    Requeue,
    DeadLetter,
}

impl From<WmsCallError> for Outcome {
    fn from(e: WmsCallError) -> Self {
        match e.class {
            WmsResponseClass::Retriable => Outcome::Requeue,
            WmsResponseClass::NonRetriable => Outcome::DeadLetter,
        }
    }
}

async fn resolve_external_batch_id(pool: &PgPool, batch_id: i64) -> Option<String> {
    let mut conn = pool.acquire().await.ok()?;
    let batch = inv_db::batches::find_by_id(&mut conn, batch_id).await.ok()??;
    batch.external_batch_id
}

async fn record_wms_outbound_ledger(
    pool: &PgPool,
    batch_id: i64,
    order_id: &str,
    action: &str,
) -> Result<(), anyhow::Error> {
    let mut conn = pool.acquire().await?;
    ledger::append(
        &mut conn,
        ledger::NewLedgerEntry {
            batch_id,
            r#type: "ADJUSTMENT",
            quantity_delta: 0,
            source: "WMS_OUTBOUND",
            reference_id: Some(order_id),
            metadata: Some(serde_json::json!({ "action": action })),
        },
    )
    .await?;
    Ok(())
}

async fn handle_allocated(pool: &PgPool, client: &dyn WmsClient, payload: serde_json::Value) -> Outcome {
    let event: InventoryAllocated = match serde_json::from_value(payload) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "unparseable InventoryAllocated payload");
            return Outcome::DeadLetter;
        }
    };

    let Some(external_batch_id) = resolve_external_batch_id(pool, event.batch_id).await else {
        warn!(batch_id = event.batch_id, "no external_batch_id for allocated batch");
        return Outcome::DeadLetter;
    };

    match client.allocate(&external_batch_id, event.quantity, &event.order_id).await {
        Ok(()) => {
            if let Err(e) =
                record_wms_outbound_ledger(pool, event.batch_id, &event.order_id, "allocate").await
            {
                warn!(error = %e, "failed to record wms outbound ledger entry");
                return Outcome::DeadLetter;
            }
            Outcome::Ack
        }
        Err(e) => e.into(),
    }
}

async fn handle_released(pool: &PgPool, client: &dyn WmsClient, payload: serde_json::Value) -> Outcome {
    let event: InventoryReleased = match serde_json::from_value(payload) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "unparseable InventoryReleased payload");
            return Outcome::DeadLetter;
        }
    };

    let Some(external_batch_id) = resolve_external_batch_id(pool, event.batch_id).await else {
        warn!(batch_id = event.batch_id, "no external_batch_id for released batch");
        return Outcome::DeadLetter;
    };

    match client.release(&external_batch_id, event.quantity, &event.order_id).await {
        Ok(()) => {
            if let Err(e) =
                record_wms_outbound_ledger(pool, event.batch_id, &event.order_id, "release").await
            {
                warn!(error = %e, "failed to record wms outbound ledger entry");
                return Outcome::DeadLetter;
            }
            Outcome::Ack
        }
        Err(e) => e.into(),
    }
}
