//! C2, the Outbox Dispatcher (spec §4.2). Drains `PENDING` outbox rows in
//! batches, publishing each to the broker and marking it `SENT` or `FAILED`
//! inside the same transaction that claimed it via `FOR UPDATE SKIP LOCKED`
//! — the held row lock is what keeps two concurrent dispatchers from
//! double-publishing, there is no separate CLAIMED state to manage.

use std::time::Duration;

use inv_broker::EventPublisher;
use inv_config::DispatcherConfig;
use inv_db::error::InventoryError;
use inv_db::outbox;
use inv_schemas::EventType;
use sqlx::PgPool;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchStats {
    pub sent: u32,
    pub failed: u32,
}

/// Claim and publish up to `batch_size` pending events, committing the
/// outcome of the whole batch in one transaction (spec §4.2 steps 1-4).
pub async fn run_once(
    pool: &PgPool,
    publisher: &dyn EventPublisher,
    batch_size: i64,
) -> Result<DispatchStats, InventoryError> {
    let mut tx = pool.begin().await?;
    let pending = outbox::select_pending_for_dispatch(&mut tx, batch_size).await?;

    let mut stats = DispatchStats::default();
    for event in pending {
        let routing_key = match EventType::parse(&event.r#type) {
            Some(event_type) => event_type.routing_key(),
            None => format!("inventory.{}", event.r#type),
        };

        match publisher.publish(&routing_key, event.id, event.payload.clone()).await {
            Ok(()) => {
                outbox::mark_sent(&mut tx, event.id).await?;
                stats.sent += 1;
            }
            Err(e) => {
                warn!(outbox_id = event.id, error = %e, "outbox publish failed");
                outbox::mark_failed(&mut tx, event.id, &e.0).await?;
                stats.failed += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(stats)
}

/// Poll forever at `poll_interval_ms`, logging what each batch did. Runs
/// until the process is killed; callers that need graceful shutdown should
/// race this future against a signal instead of expecting it to return.
pub async fn run_forever(pool: &PgPool, publisher: &dyn EventPublisher, config: DispatcherConfig) {
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    loop {
        ticker.tick().await;
        match run_once(pool, publisher, config.batch_size).await {
            Ok(stats) if stats.sent > 0 || stats.failed > 0 => {
                info!(sent = stats.sent, failed = stats.failed, "dispatch batch complete");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "dispatch batch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inv_broker::InMemoryBroker;

    #[tokio::test]
    async fn unknown_event_type_still_derives_a_routing_key() {
        // EventType::parse returning None shouldn't panic the dispatcher; it
        // falls back to a routing key built straight from the stored type.
        let broker = InMemoryBroker::new();
        broker
            .publish("inventory.SomethingUnrecognized", 1, serde_json::json!({}))
            .await
            .unwrap();
        let published = broker.published().await;
        assert_eq!(published[0].routing_key, "inventory.SomethingUnrecognized");
    }
}
