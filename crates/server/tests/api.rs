use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use db::DBService;
use serde_json::{Value, json};
use server::{Deployment, app};
use services::services::{clock::FixedClock, config::AppConfig};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    clock: Arc<FixedClock>,
    db: DBService,
}

async fn test_app_with(config: AppConfig) -> TestApp {
    let db = DBService::new_in_memory().await.unwrap();
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap(),
    ));
    let deployment = Deployment::new(db.clone(), clock.clone(), &config);
    TestApp {
        router: app(deployment),
        clock,
        db,
    }
}

async fn test_app() -> TestApp {
    test_app_with(AppConfig::default()).await
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn seed(app: &TestApp) -> (i64, i64, i64) {
    let (status, main) = send(
        app,
        "POST",
        "/api/warehouses",
        Some(json!({ "name": "Main", "location": "Dock A" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, backup) = send(
        app,
        "POST",
        "/api/warehouses",
        Some(json!({ "name": "Backup" })),
    )
    .await;
    let (status, product) = send(
        app,
        "POST",
        "/api/products",
        Some(json!({ "name": "Steel Bolt", "sku": "BOLT-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        main["id"].as_i64().unwrap(),
        backup["id"].as_i64().unwrap(),
        product["id"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_next_number_for_every_kind_starts_at_one() {
    let app = test_app().await;
    for (slug, expected) in [
        ("adjustments", "ADJ-2024-001"),
        ("deliveries", "DEL-2024-001"),
        ("transfers", "TRF-2024-001"),
        ("receipts", "REC-2024-001"),
    ] {
        let (status, body) = send(&app, "GET", &format!("/api/{slug}/next-number"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "next": expected }));
    }
}

#[tokio::test]
async fn test_adjustment_number_advances_after_create() {
    let app = test_app().await;
    let (warehouse, _, product) = seed(&app).await;

    let (_, body) = send(&app, "GET", "/api/adjustments/next-number", None).await;
    assert_eq!(body, json!({ "next": "ADJ-2024-001" }));

    let (status, created) = send(
        &app,
        "POST",
        "/api/adjustments",
        Some(json!({
            "adjustmentNumber": body["next"],
            "warehouseId": warehouse,
            "productId": product,
            "increase_by": 12,
            "decrease_by": 0,
            "notes": "initial count",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["adjustmentNumber"], "ADJ-2024-001");
    assert_eq!(created["countedQuantity"], 12);
    assert_eq!(created["product"]["sku"], "BOLT-10");

    let (_, body) = send(&app, "GET", "/api/adjustments/next-number", None).await;
    assert_eq!(body, json!({ "next": "ADJ-2024-002" }));
}

#[tokio::test]
async fn test_sequence_restarts_in_new_year() {
    let app = test_app().await;
    let (warehouse, _, product) = seed(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/receipts",
        Some(json!({
            "receiptNumber": "REC-2024-001",
            "warehouseId": warehouse,
            "supplierName": "Acme",
            "items": [{ "productId": product, "quantity": 3 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    app.clock
        .set(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap());
    let (_, body) = send(&app, "GET", "/api/receipts/next-number", None).await;
    assert_eq!(body, json!({ "next": "REC-2025-001" }));
}

#[tokio::test]
async fn test_duplicate_number_is_reallocated() {
    let app = test_app().await;
    let (warehouse, _, product) = seed(&app).await;
    let payload = json!({
        "deliveryNumber": "DEL-2024-001",
        "warehouseId": warehouse,
        "customerName": "Globex",
        "items": [{ "productId": product, "quantity": 1, "unitPrice": 2.5 }],
    });

    let (status, first) = send(&app, "POST", "/api/deliveries", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["deliveryNumber"], "DEL-2024-001");
    assert_eq!(first["items"][0]["productName"], "Steel Bolt");

    let (status, second) = send(&app, "POST", "/api/deliveries", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["deliveryNumber"], "DEL-2024-002");
}

#[tokio::test]
async fn test_duplicate_number_without_retry_is_conflict() {
    let config = AppConfig {
        insert_attempts: 1,
        ..AppConfig::default()
    };
    let app = test_app_with(config).await;
    let (from, to, _) = seed(&app).await;
    let payload = json!({
        "transferNumber": "TRF-2024-001",
        "fromWarehouseId": from,
        "toWarehouseId": to,
    });

    let (status, _) = send(&app, "POST", "/api/transfers", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/api/transfers", Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "transfer number TRF-2024-001 is already in use"
    );
}

#[tokio::test]
async fn test_transfer_between_same_warehouse_is_rejected() {
    let app = test_app().await;
    let (warehouse, _, _) = seed(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/transfers",
        Some(json!({
            "transferNumber": "TRF-2024-001",
            "fromWarehouseId": warehouse,
            "toWarehouseId": warehouse,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "From and To warehouses must be different");
}

#[tokio::test]
async fn test_validate_updates_stock_and_status() {
    let app = test_app().await;
    let (warehouse, _, product) = seed(&app).await;

    let (_, receipt) = send(
        &app,
        "POST",
        "/api/receipts",
        Some(json!({
            "receiptNumber": "REC-2024-001",
            "warehouseId": warehouse,
            "supplierName": "Acme",
            "items": [{ "productId": product, "quantity": 8, "unitPrice": 1.25 }],
        })),
    )
    .await;
    let id = receipt["id"].as_i64().unwrap();

    let (status, validated) =
        send(&app, "POST", &format!("/api/receipts/{id}/validate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["status"], "done");

    let (status, stock) = send(&app, "GET", &format!("/api/products/{product}/stock"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock[0]["warehouseName"], "Main");
    assert_eq!(stock[0]["quantity"], 8);

    let (status, _) = send(&app, "POST", &format!("/api/receipts/{id}/validate"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delivery_short_on_stock() {
    let app = test_app().await;
    let (warehouse, _, product) = seed(&app).await;
    let (_, delivery) = send(
        &app,
        "POST",
        "/api/deliveries",
        Some(json!({
            "deliveryNumber": "DEL-2024-001",
            "warehouseId": warehouse,
            "customerName": "Globex",
            "items": [{ "productId": product, "quantity": 5 }],
        })),
    )
    .await;
    let id = delivery["id"].as_i64().unwrap();

    let (status, _) = send(&app, "POST", &format!("/api/deliveries/{id}/validate"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, detail) = send(&app, "GET", &format!("/api/deliveries/{id}"), None).await;
    assert_eq!(detail["status"], "draft");

    let (status, cancelled) =
        send(&app, "POST", &format!("/api/deliveries/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
}

#[tokio::test]
async fn test_missing_documents_are_not_found() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/receipts/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Receipt 77 not found");

    let (status, _) = send(&app, "POST", "/api/adjustments/77/validate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lists_filter_by_status_and_search() {
    let app = test_app().await;
    let (warehouse, _, product) = seed(&app).await;
    for number in ["REC-2024-001", "REC-2024-002"] {
        send(
            &app,
            "POST",
            "/api/receipts",
            Some(json!({
                "receiptNumber": number,
                "warehouseId": warehouse,
                "supplierName": "Acme",
                "items": [{ "productId": product, "quantity": 1 }],
            })),
        )
        .await;
    }
    send(&app, "POST", "/api/receipts/1/cancel", None).await;

    let (_, drafts) = send(&app, "GET", "/api/receipts?status=draft", None).await;
    assert_eq!(drafts.as_array().map(Vec::len), Some(1));
    assert_eq!(drafts[0]["receiptNumber"], "REC-2024-002");

    let (_, found) = send(&app, "GET", "/api/receipts?search=001", None).await;
    assert_eq!(found.as_array().map(Vec::len), Some(1));

    let (_, products) = send(&app, "GET", "/api/products?search=bolt", None).await;
    assert_eq!(products[0]["sku"], "BOLT-10");
}

#[tokio::test]
async fn test_next_number_fails_when_database_is_closed() {
    let app = test_app().await;
    app.db.pool.close().await;

    let (status, body) = send(&app, "GET", "/api/adjustments/next-number", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Failed to compute next adjustment number" })
    );
}

#[tokio::test]
async fn test_malformed_payload_uses_error_body() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/deliveries",
        Some(json!({ "deliveryNumber": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));
    assert_eq!(body.as_object().map(|o| o.len()), Some(1));

    let request = Request::builder()
        .method("POST")
        .uri("/api/products")
        .body(Body::from("{\"name\": \"Bolt\"}"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}
