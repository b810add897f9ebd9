//! End-to-end scenarios from spec §8, run against a real Postgres instance
//! via `inv-testkit`'s fixtures. Each transaction is opened and committed by
//! the test itself, matching the caller-owns-the-transaction contract
//! `inv_reservation::{reserve,release,adjust}` expects.

use inv_db::error::InventoryError;
use inv_reservation::{adjust, release, reserve, ReserveLine};

async fn pool() -> sqlx::PgPool {
    inv_testkit::db_pool().await.expect("connect to INV_DATABASE_URL")
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn five_parallel_reserves_of_five_from_ten_yields_exactly_two_successes() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-PARALLEL").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 10).await.unwrap();

    let results = futures_util::future::join_all((0..5).map(|i| {
        let pool = pool.clone();
        async move {
            let mut tx = pool.begin().await.unwrap();
            let order_id = format!("ORDER-{i}");
            let outcome =
                reserve(&mut tx, &order_id, &[ReserveLine { batch_id, quantity: 5 }]).await;
            if outcome.is_ok() {
                tx.commit().await.unwrap();
            } else {
                tx.rollback().await.unwrap();
            }
            outcome
        }
    }))
    .await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let failures = results
        .iter()
        .filter(|r| matches!(r, Err(InventoryError::InsufficientInventory { .. })))
        .count();
    assert_eq!(successes, 2);
    assert_eq!(failures, 3);

    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 0);
    assert_eq!(
        inv_testkit::outbox_count_by_type_for_batch(&pool, "InventoryAllocated", batch_id)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn repeat_reserve_with_identical_lines_is_idempotent() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-IDEMPOTENT").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 100).await.unwrap();
    let lines = [ReserveLine { batch_id, quantity: 10 }];

    let mut tx = pool.begin().await.unwrap();
    reserve(&mut tx, "ORDER-IDEMPOTENT", &lines).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 90);

    let mut tx = pool.begin().await.unwrap();
    reserve(&mut tx, "ORDER-IDEMPOTENT", &lines).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 90);
    assert_eq!(
        inv_testkit::outbox_count_by_type_for_order(&pool, "InventoryAllocated", "ORDER-IDEMPOTENT")
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn reserve_with_different_lines_for_same_order_conflicts() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-CONFLICT").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 100).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    reserve(&mut tx, "ORDER-CONFLICT", &[ReserveLine { batch_id, quantity: 10 }])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let err = reserve(&mut tx, "ORDER-CONFLICT", &[ReserveLine { batch_id, quantity: 20 }])
        .await
        .unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(err, InventoryError::OrderAlreadyReserved { .. }));
    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 90);
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn reserve_then_release_round_trips_available_quantity() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-ROUNDTRIP").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 100).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    reserve(&mut tx, "ORDER-ROUNDTRIP", &[ReserveLine { batch_id, quantity: 10 }])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    release(&mut tx, "ORDER-ROUNDTRIP", None).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 100);
    assert_eq!(
        inv_testkit::outbox_count_by_type_for_order(&pool, "InventoryAllocated", "ORDER-ROUNDTRIP")
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        inv_testkit::outbox_count_by_type_for_order(&pool, "InventoryReleased", "ORDER-ROUNDTRIP")
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        inv_testkit::reservation_statuses_for_order(&pool, "ORDER-ROUNDTRIP").await.unwrap(),
        vec!["CANCELLED".to_string()]
    );
    assert_eq!(inv_testkit::ledger_delta_sum(&pool, batch_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn re_reserve_with_same_lines_after_release_conflicts() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-RE-RESERVE").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 100).await.unwrap();
    let lines = [ReserveLine { batch_id, quantity: 10 }];

    let mut tx = pool.begin().await.unwrap();
    reserve(&mut tx, "ORDER-RE-RESERVE", &lines).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    release(&mut tx, "ORDER-RE-RESERVE", None).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let err = reserve(&mut tx, "ORDER-RE-RESERVE", &lines).await.unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(err, InventoryError::OrderAlreadyReserved { .. }));
    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 100);
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn release_on_unknown_order_fails_not_found() {
    let pool = pool().await;
    let mut tx = pool.begin().await.unwrap();
    let err = release(&mut tx, "ORDER-NEVER-EXISTED", None).await.unwrap_err();
    tx.rollback().await.unwrap();
    assert!(matches!(err, InventoryError::OrderNotFound { .. }));
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn release_on_already_cancelled_order_is_a_no_op_success() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-DOUBLE-RELEASE").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 50).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    reserve(&mut tx, "ORDER-DOUBLE-RELEASE", &[ReserveLine { batch_id, quantity: 5 }])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    release(&mut tx, "ORDER-DOUBLE-RELEASE", None).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    release(&mut tx, "ORDER-DOUBLE-RELEASE", None).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 50);
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn requesting_exactly_available_quantity_succeeds_and_zeroes_it() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-EXACT").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 7).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    reserve(&mut tx, "ORDER-EXACT", &[ReserveLine { batch_id, quantity: 7 }]).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn requesting_one_more_than_available_fails_without_mutation() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-OVER").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 7).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let err = reserve(&mut tx, "ORDER-OVER", &[ReserveLine { batch_id, quantity: 8 }])
        .await
        .unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(err, InventoryError::InsufficientInventory { .. }));
    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 7);
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn adjust_is_not_idempotent_each_call_adds_its_delta() {
    let pool = pool().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-ADJUST").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 100).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let first = adjust(&mut tx, batch_id, -5, "count correction").await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(first, 95);

    let mut tx = pool.begin().await.unwrap();
    let second = adjust(&mut tx, batch_id, -5, "count correction").await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(second, 90);
}
