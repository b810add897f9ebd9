//! DB-applying half of C4 (spec §4.4): drives the `SyncRequest` state
//! machine, calls the WMS snapshot endpoint, and applies each returned
//! entry under the same ascending-id row-lock discipline as Reserve/Release
//! (spec §5), persisting audit trail alongside every mutation.

use std::time::Duration;

use inv_broker::SyncCommandConsumer;
use inv_db::error::InventoryError;
use inv_db::{batches, ledger, outbox, wms};
use inv_schemas::InventoryAdjusted;
use inv_wms::{SyncPage, SyncScope, WmsClient, WmsSnapshotResponse};
use sqlx::PgPool;
use tracing::{info, warn};

/// Outcome of driving one `ForceWmsSync` command to completion, for the
/// caller's logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Done,
    Failed,
}

/// Run the full C4 protocol for one `ForceWmsSync` command (spec §4.4 steps
/// 1-4). Never returns an `Err` for a WMS-side failure — that is recorded on
/// the `SyncRequest` row as `FAILED` instead; `Err` is reserved for a
/// database failure the caller cannot recover from.
pub async fn process_sync_request(
    pool: &PgPool,
    client: &dyn WmsClient,
    sync_request_id: i64,
    batch_id: Option<i64>,
) -> Result<RequestOutcome, InventoryError> {
    wms::mark_sync_request_in_progress(pool, sync_request_id).await?;

    let scope_result = resolve_scope(pool, batch_id).await?;
    let scope = match scope_result {
        Some(s) => s,
        None => {
            let msg = format!("batch {} has no external_batch_id", batch_id.unwrap_or(0));
            wms::mark_sync_request_failed(pool, sync_request_id, &msg).await?;
            return Ok(RequestOutcome::Failed);
        }
    };

    let page = match client.fetch_sync_page(scope.as_scope()).await {
        Ok(page) => page,
        Err(e) => {
            warn!(sync_request_id, error = %e, "wms snapshot fetch failed");
            wms::mark_sync_request_failed(pool, sync_request_id, &e.message).await?;
            return Ok(RequestOutcome::Failed);
        }
    };

    if let Err(e) = apply_page(pool, &page).await {
        wms::mark_sync_request_failed(pool, sync_request_id, &e.to_string()).await?;
        return Ok(RequestOutcome::Failed);
    }

    advance_sync_state(pool, &scope, &page).await?;
    wms::mark_sync_request_done(pool, sync_request_id).await?;
    info!(sync_request_id, entries = page.entries.len(), "reconciliation complete");
    Ok(RequestOutcome::Done)
}

enum ResolvedScope {
    Batch(String),
    Full,
    Incremental(String),
}

impl ResolvedScope {
    fn as_scope(&self) -> SyncScope<'_> {
        match self {
            ResolvedScope::Batch(id) => SyncScope::Batch(id),
            ResolvedScope::Full => SyncScope::Full,
            ResolvedScope::Incremental(token) => SyncScope::Incremental(token),
        }
    }
}

/// `Ok(None)` means the command named a batch with no `external_batch_id`
/// to scope the WMS call to — treated as a failed sync, not a database error.
async fn resolve_scope(
    pool: &PgPool,
    batch_id: Option<i64>,
) -> Result<Option<ResolvedScope>, InventoryError> {
    match batch_id {
        Some(id) => {
            let mut conn = pool.acquire().await?;
            let batch = batches::find_by_id(&mut conn, id).await?;
            Ok(batch.and_then(|b| b.external_batch_id).map(ResolvedScope::Batch))
        }
        None => {
            let state = wms::load_sync_state(pool).await?;
            Ok(Some(match state.last_incremental_token {
                Some(token) => ResolvedScope::Incremental(token),
                None => ResolvedScope::Full,
            }))
        }
    }
}

/// Apply every entry in the page, each in its own transaction, in ascending
/// local-batch-id order (spec §4.4 step 3, §5) — entries with no local
/// match sort last and only ever produce an audit row.
async fn apply_page(pool: &PgPool, page: &SyncPage) -> Result<(), InventoryError> {
    let mut resolved = Vec::with_capacity(page.entries.len());
    {
        let mut conn = pool.acquire().await?;
        for entry in &page.entries {
            let batch_id = batches::find_by_external_id(&mut conn, &entry.wms_batch_id)
                .await?
                .map(|b| b.id);
            resolved.push((batch_id, entry));
        }
    }
    resolved.sort_by_key(|(batch_id, _)| (batch_id.is_none(), *batch_id));

    for (batch_id, entry) in resolved {
        apply_snapshot_entry(pool, batch_id, entry).await?;
    }
    Ok(())
}

async fn apply_snapshot_entry(
    pool: &PgPool,
    batch_id: Option<i64>,
    entry: &WmsSnapshotResponse,
) -> Result<(), InventoryError> {
    let mut tx = pool.begin().await?;

    wms::insert_snapshot(
        &mut tx,
        &entry.wms_batch_id,
        batch_id,
        entry.reported_orderable,
        entry.reported_unallocatable,
        entry.raw_payload.clone(),
    )
    .await?;

    let Some(batch_id) = batch_id else {
        // Unmatched WMS batch: only the snapshot audit row is recorded.
        tx.commit().await?;
        return Ok(());
    };

    let batch = batches::lock_batch(&mut tx, batch_id).await?;
    let Some(delta) = crate::diff(batch.available_quantity, entry.reported_orderable) else {
        tx.commit().await?;
        return Ok(());
    };

    batches::set_available_quantity(&mut tx, batch_id, delta.new).await?;
    ledger::append(
        &mut tx,
        ledger::NewLedgerEntry {
            batch_id,
            r#type: "ADJUSTMENT",
            quantity_delta: delta.delta,
            source: "WMS_SYNC",
            reference_id: Some(&entry.wms_batch_id),
            metadata: Some(serde_json::json!({ "previous": delta.previous, "new": delta.new })),
        },
    )
    .await?;

    let event = InventoryAdjusted {
        batch_id,
        quantity_delta: delta.delta,
        new_available: delta.new,
        source: "WMS_SYNC".to_string(),
        reason: None,
        timestamp: chrono::Utc::now(),
    };
    outbox::insert(&mut tx, "InventoryAdjusted", serde_json::to_value(event)?).await?;

    tx.commit().await?;
    Ok(())
}

/// Drain up to `prefetch` `ForceWmsSync` commands once, driving each to
/// completion and acking the delivery regardless of whether the sync itself
/// ended DONE or FAILED — the command was handled either way, the outcome
/// lives on the `SyncRequest` row.
pub async fn run_once(
    pool: &PgPool,
    consumer: &dyn SyncCommandConsumer,
    client: &dyn WmsClient,
    prefetch: usize,
) -> Result<u32, InventoryError> {
    let mut handled = 0;
    for delivery in consumer.poll(prefetch).await {
        let result = process_sync_request(
            pool,
            client,
            delivery.command.sync_request_id,
            delivery.command.batch_id,
        )
        .await;

        match result {
            Ok(_) => consumer.ack(&delivery.delivery_tag).await,
            Err(e) => {
                warn!(error = %e, "reconcile driver failed on a database error, dead-lettering");
                consumer.nack_dead_letter(&delivery.delivery_tag).await;
            }
        }
        handled += 1;
    }
    Ok(handled)
}

/// Poll forever at `poll_interval_ms`. Runs until killed.
pub async fn run_forever(
    pool: &PgPool,
    consumer: &dyn SyncCommandConsumer,
    client: &dyn WmsClient,
    prefetch: usize,
    poll_interval_ms: u64,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(poll_interval_ms));
    loop {
        ticker.tick().await;
        match run_once(pool, consumer, client, prefetch).await {
            Ok(0) => {}
            Ok(n) => info!(handled = n, "processed sync commands"),
            Err(e) => warn!(error = %e, "reconcile batch failed"),
        }
    }
}

async fn advance_sync_state(
    pool: &PgPool,
    scope: &ResolvedScope,
    page: &SyncPage,
) -> Result<(), InventoryError> {
    match scope {
        ResolvedScope::Batch(_) => Ok(()),
        ResolvedScope::Full => wms::update_sync_state_full(pool, chrono::Utc::now()).await,
        ResolvedScope::Incremental(_) => match &page.next_incremental_token {
            Some(token) => wms::update_sync_state_incremental_token(pool, token).await,
            None => Ok(()),
        },
    }
}
