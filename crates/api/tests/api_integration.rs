//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, api::InMemoryBackends) {
    let (state, backends) = api::create_default_state();
    let app = api::create_app(state, get_metrics_handle());
    (app, backends)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn create_order_body(customer_id: &str, product_id: &str, quantity: u32) -> serde_json::Value {
    serde_json::json!({
        "customer_id": customer_id,
        "items": [{
            "product_id": product_id,
            "quantity": quantity,
        }],
        "shipping_address": {
            "recipient": "Test Customer",
            "line1": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US",
        },
        "payment_method": "card",
    })
}

#[tokio::test]
async fn health_check() {
    let (app, _) = setup();

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "storefront-orders");
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let (app, _) = setup();

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_order_returns_created() {
    let (app, backends) = setup();
    backends.catalog.add_simple("PROD-C", "Gadget", 100);
    backends.inventory.set_stock("PROD-C", 10);
    let customer_id = uuid::Uuid::new_v4().to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            create_order_body(&customer_id, "PROD-C", 1),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = read_json(response).await;
    assert_eq!(json["status"], "PaymentPending");
    assert_eq!(json["customer_id"], customer_id);
    // 100 subtotal + 10% tax + 3000 flat shipping.
    assert_eq!(json["total_cents"], 3110);
    assert!(json["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert!(json["payment_id"].as_str().is_some());
}

#[tokio::test]
async fn create_order_with_insufficient_stock_conflicts() {
    let (app, backends) = setup();
    backends.catalog.add_simple("PROD-A", "Widget", 2500);
    backends.inventory.set_stock("PROD-A", 1);
    let customer_id = uuid::Uuid::new_v4().to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            create_order_body(&customer_id, "PROD-A", 2),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = read_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("PROD-A"));
}

#[tokio::test]
async fn create_order_rejects_malformed_customer_id() {
    let (app, _) = setup();

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            create_order_body("not-a-uuid", "PROD-C", 1),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_order_roundtrip_and_not_found() {
    let (app, backends) = setup();
    backends.catalog.add_simple("PROD-C", "Gadget", 100);
    backends.inventory.set_stock("PROD-C", 10);
    let customer_id = uuid::Uuid::new_v4().to_string();

    let created = read_json(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/orders",
                create_order_body(&customer_id, "PROD-C", 1),
            ))
            .await
            .unwrap(),
    )
    .await;
    let order_id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = read_json(response).await;
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["order_number"], created["order_number"]);

    let missing = uuid::Uuid::new_v4();
    let response = app
        .oneshot(get_request(&format!("/orders/{missing}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_and_cancellation_flow() {
    let (app, backends) = setup();
    backends.catalog.add_simple("PROD-C", "Gadget", 100);
    backends.inventory.set_stock("PROD-C", 10);
    let customer_id = uuid::Uuid::new_v4().to_string();

    let created = read_json(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/orders",
                create_order_body(&customer_id, "PROD-C", 2),
            ))
            .await
            .unwrap(),
    )
    .await;
    let order_id = created["id"].as_str().unwrap();
    let payment_id = created["payment_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/payment"),
            serde_json::json!({ "payment_id": payment_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let paid = read_json(response).await;
    assert_eq!(paid["status"], "Paid");

    // A second confirmation conflicts with the Paid status.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/payment"),
            serde_json::json!({ "payment_id": payment_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            serde_json::json!({ "customer_id": customer_id, "reason": "changed my mind" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = read_json(response).await;
    assert_eq!(cancelled["status"], "Cancelled");
}

#[tokio::test]
async fn shipping_update_rejected_before_payment() {
    let (app, backends) = setup();
    backends.catalog.add_simple("PROD-C", "Gadget", 100);
    backends.inventory.set_stock("PROD-C", 10);
    let customer_id = uuid::Uuid::new_v4().to_string();

    let created = read_json(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/orders",
                create_order_body(&customer_id, "PROD-C", 1),
            ))
            .await
            .unwrap(),
    )
    .await;
    let order_id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/shipping"),
            serde_json::json!({ "status": "Preparing" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_and_stats_scope_to_customer() {
    let (app, backends) = setup();
    backends.catalog.add_simple("PROD-C", "Gadget", 100);
    backends.inventory.set_stock("PROD-C", 10);
    let customer_id = uuid::Uuid::new_v4().to_string();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            create_order_body(&customer_id, "PROD-C", 1),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders?customer_id={customer_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/orders/stats?customer_id={customer_id}"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = read_json(response).await;
    assert_eq!(stats["total_orders"], 1);

    // A different customer sees neither the listing nor the stats.
    let other = uuid::Uuid::new_v4();
    let response = app
        .oneshot(get_request(&format!("/orders?customer_id={other}")))
        .await
        .unwrap();
    let listed = read_json(response).await;
    assert!(listed.as_array().unwrap().is_empty());
}
