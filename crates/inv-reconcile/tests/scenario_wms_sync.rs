//! End-to-end scenario 5 from spec §8: a WMS snapshot reporting a lower
//! orderable quantity than the store believes drives exactly one ADJUSTMENT
//! ledger row and one `InventoryAdjusted` outbox event.

use inv_reconcile::driver::{process_sync_request, RequestOutcome};
use inv_wms::{MockWmsClient, SyncPage, WmsSnapshotResponse};

async fn pool() -> sqlx::PgPool {
    inv_testkit::db_pool().await.expect("connect to INV_DATABASE_URL")
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn wms_reporting_lower_orderable_adjusts_the_batch_down() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-WMS-SYNC").await.unwrap();
    let batch_id =
        inv_testkit::insert_batch_with_external_id(&pool, sku, 90, "EXT-WMS-SYNC").await.unwrap();

    let client = MockWmsClient::new();
    client.set_next_sync_page(SyncPage {
        entries: vec![WmsSnapshotResponse {
            wms_batch_id: "EXT-WMS-SYNC".to_string(),
            reported_orderable: 85,
            reported_unallocatable: None,
            raw_payload: serde_json::json!({ "source": "test" }),
        }],
        next_incremental_token: None,
    });

    let sync_request =
        inv_db::wms::insert_sync_request(&pool, "test-harness", "manual", Some(batch_id), 0)
            .await
            .unwrap();

    let outcome =
        process_sync_request(&pool, &client, sync_request.id, Some(batch_id)).await.unwrap();
    assert_eq!(outcome, RequestOutcome::Done);

    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 85);

    let ledger_sum = inv_testkit::ledger_delta_sum(&pool, batch_id).await.unwrap();
    assert_eq!(ledger_sum, -5);

    assert_eq!(
        inv_testkit::outbox_count_by_type_for_batch(&pool, "InventoryAdjusted", batch_id)
            .await
            .unwrap(),
        1
    );

    let fetched = inv_db::wms::fetch_sync_request(&pool, sync_request.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, "DONE");
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn matching_report_is_a_no_op() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-WMS-NOOP").await.unwrap();
    let batch_id =
        inv_testkit::insert_batch_with_external_id(&pool, sku, 40, "EXT-WMS-NOOP").await.unwrap();

    let client = MockWmsClient::new();
    client.set_next_sync_page(SyncPage {
        entries: vec![WmsSnapshotResponse {
            wms_batch_id: "EXT-WMS-NOOP".to_string(),
            reported_orderable: 40,
            reported_unallocatable: None,
            raw_payload: serde_json::json!({}),
        }],
        next_incremental_token: None,
    });

    let sync_request =
        inv_db::wms::insert_sync_request(&pool, "test-harness", "manual", Some(batch_id), 0)
            .await
            .unwrap();

    process_sync_request(&pool, &client, sync_request.id, Some(batch_id)).await.unwrap();

    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 40);
    assert_eq!(
        inv_testkit::outbox_count_by_type_for_batch(&pool, "InventoryAdjusted", batch_id)
            .await
            .unwrap(),
        0
    );
}
