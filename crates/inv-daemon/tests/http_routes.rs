//! HTTP-surface scenarios for inv-daemon, run against a real Postgres
//! instance via `inv-testkit`. These drive the router the same way a real
//! client would — over `Request`/`Response`, through `tower::ServiceExt`
//! rather than calling handlers directly — so a wire-format regression like
//! a stray snake_case field would actually be caught here.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use inv_daemon::{routes::build_router, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn router() -> (axum::Router, sqlx::PgPool) {
    let pool = inv_testkit::db_pool().await.expect("connect to INV_DATABASE_URL");
    let state = Arc::new(AppState::new(pool.clone()));
    (build_router(state), pool)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is valid JSON")
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn health_reports_ok() {
    let (router, _pool) = router().await;

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["service"], json!("inv-daemon"));
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn reserve_and_view_round_trip_camel_case_wire_shapes() {
    let (router, pool) = router().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-HTTP-RESERVE").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 20).await.unwrap();

    let reserve_body = json!({
        "orderId": "ORDER-HTTP-1",
        "lines": [{"batchId": batch_id, "quantity": 5}],
    });
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inventory/reserve")
                .header("content-type", "application/json")
                .body(Body::from(reserve_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["orderId"], json!("ORDER-HTTP-1"));
    assert_eq!(body["status"], json!("ok"));

    let response = router
        .oneshot(Request::builder().uri("/inventory/SKU-HTTP-RESERVE").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["skuCode"], json!("SKU-HTTP-RESERVE"));
    assert_eq!(body["totalAvailable"], json!(15));
    assert_eq!(body["batches"][0]["batchId"], json!(batch_id));
    assert_eq!(body["batches"][0]["availableQuantity"], json!(15));
    // snake_case keys must not leak onto the wire
    assert!(body.get("total_available").is_none());
    assert!(body["batches"][0].get("batch_id").is_none());
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn reserve_over_available_quantity_returns_error_body() {
    let (router, pool) = router().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-HTTP-OVER").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 3).await.unwrap();

    let reserve_body = json!({
        "orderId": "ORDER-HTTP-OVER",
        "lines": [{"batchId": batch_id, "quantity": 10}],
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inventory/reserve")
                .header("content-type", "application/json")
                .body(Body::from(reserve_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("INSUFFICIENT_INVENTORY"));
    assert!(body["message"].as_str().unwrap().contains("10"));
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn inventory_for_unknown_sku_is_not_found() {
    let (router, _pool) = router().await;

    let response = router
        .oneshot(Request::builder().uri("/inventory/NO-SUCH-SKU").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("SKU_NOT_FOUND"));
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn admin_adjust_returns_new_available_quantity() {
    let (router, pool) = router().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-HTTP-ADJUST").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 50).await.unwrap();

    let adjust_body = json!({"batchId": batch_id, "quantityDelta": -10, "reason": "cycle count"});
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/inventory/adjust")
                .header("content-type", "application/json")
                .body(Body::from(adjust_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["newAvailableQuantity"], json!(40));
}

#[tokio::test]
#[ignore = "requires INV_DATABASE_URL"]
async fn release_after_reserve_round_trips_over_http() {
    let (router, pool) = router().await;
    let sku = inv_testkit::insert_sku(&pool, "SKU-HTTP-RELEASE").await.unwrap();
    let batch_id = inv_testkit::insert_batch(&pool, sku, 12).await.unwrap();

    let reserve_body = json!({
        "orderId": "ORDER-HTTP-RELEASE",
        "lines": [{"batchId": batch_id, "quantity": 12}],
    });
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inventory/reserve")
                .header("content-type", "application/json")
                .body(Body::from(reserve_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let release_body = json!({"orderId": "ORDER-HTTP-RELEASE", "reason": "customer cancelled"});
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inventory/release")
                .header("content-type", "application/json")
                .body(Body::from(release_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(inv_testkit::available_quantity(&pool, batch_id).await.unwrap(), 12);
}
