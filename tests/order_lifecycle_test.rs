mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, captured_event, TestApp};
use pixelkit_api::{
    models::OrderStatus,
    repositories::OrderRepository,
    services::SandboxPaymentGateway,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn capture_then_redelivery_completes_once_with_one_confirmation() {
    let app = TestApp::with_gateway(SandboxPaymentGateway::new().with_ids(["gw_123"]));
    let product = app.seed_product();

    let response = app.create_square_order("buyer-1", product.id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["gatewayOrderId"], "gw_123");
    assert_eq!(created["amount"], 999);
    assert_eq!(created["currency"], "USD");
    assert_eq!(created["gatewayKeyId"], "rzp_test_key");

    let body = captured_event("gw_123", 999, "USD");
    let first = app.deliver_signed(&body).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        body_json(first).await,
        json!({"received": true, "disposition": "completed"})
    );

    let second = app.deliver_signed(&body).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["disposition"], "already_terminal");

    let order = app
        .orders
        .find_by_gateway_order_id("gw_123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_1"));

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "buyer-1@example.com");
    assert_eq!(sent[0].1.price, "9.99 USD");
}

#[tokio::test]
async fn underpaid_capture_leaves_order_pending_for_review() {
    let app = TestApp::with_gateway(SandboxPaymentGateway::new().with_ids(["gw_123"]));
    let product = app.seed_product();
    app.create_square_order("buyer-1", product.id).await;

    let response = app.deliver_signed(&captured_event("gw_123", 899, "USD")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["disposition"], "amount_mismatch");

    let order = app
        .orders
        .find_by_gateway_order_id("gw_123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.needs_review);
    assert_eq!(app.notifier.count(), 0);

    let anomalies = app.anomalies.all();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].order_id, Some(order.id));
    assert_eq!(anomalies[0].received_amount, Some(899));
}

#[tokio::test]
async fn parallel_duplicate_deliveries_notify_exactly_once() {
    let app = Arc::new(TestApp::with_gateway(
        SandboxPaymentGateway::new().with_ids(["gw_race"]),
    ));
    let product = app.seed_product();
    app.create_square_order("buyer-1", product.id).await;

    let body = captured_event("gw_race", 999, "USD");
    let mut handles = Vec::new();
    for _ in 0..10 {
        let app = app.clone();
        let body = body.clone();
        handles.push(tokio::spawn(async move {
            let response = app.deliver_signed(&body).await;
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await["disposition"]
                .as_str()
                .unwrap()
                .to_string()
        }));
    }

    let mut dispositions = Vec::new();
    for handle in handles {
        dispositions.push(handle.await.unwrap());
    }

    let completed = dispositions.iter().filter(|d| *d == "completed").count();
    assert_eq!(completed, 1, "dispositions: {:?}", dispositions);
    assert!(dispositions
        .iter()
        .all(|d| d == "completed" || d == "duplicate" || d == "already_terminal"));
    assert_eq!(app.notifier.count(), 1);

    let order = app
        .orders
        .find_by_gateway_order_id("gw_race")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn client_supplied_price_is_ignored() {
    let app = TestApp::new();
    let product = app.seed_product();
    let token = app.token_for("buyer-1");

    let response = app
        .request(
            Method::POST,
            "/orders",
            Some(json!({
                "productId": product.id,
                "variantSelector": {"kind": "image", "size": "SQUARE", "license": "personal"},
                "price": 1,
                "amount": 1
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["amount"], 999);

    let calls = app.gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].amount_minor_units, 999);
    assert_eq!(calls[0].currency, "USD");
}

#[tokio::test]
async fn order_endpoints_map_errors_to_statuses() {
    let app = TestApp::new();
    let product = app.seed_product();
    let token = app.token_for("buyer-1");

    // No such variant for this product
    let response = app
        .request(
            Method::POST,
            "/orders",
            Some(json!({
                "productId": product.id,
                "variantSelector": {"kind": "video", "quality": "720p", "license": "personal"}
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.create_square_order("buyer-1", Uuid::new_v4()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::POST,
            "/orders",
            Some(json!({"productId": "not-a-uuid"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.gateway.set_failing(true);
    let response = app.create_square_order("buyer-1", product.id).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Payment gateway unavailable");
    assert!(app.orders.is_empty());
}

#[tokio::test]
async fn buyers_only_see_their_own_orders() {
    let app = TestApp::new();
    let product = app.seed_product();

    let created = body_json(app.create_square_order("buyer-1", product.id).await).await;
    let order_id = created["orderId"].as_str().unwrap().to_string();

    let mine = app.token_for("buyer-1");
    let response = app
        .request(Method::GET, &format!("/orders/{order_id}"), None, Some(&mine))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["amount"], 999);
    assert!(order.get("downloadUrl").is_none());

    let listed = body_json(app.request(Method::GET, "/orders", None, Some(&mine)).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let theirs = app.token_for("buyer-2");
    let response = app
        .request(Method::GET, &format!("/orders/{order_id}"), None, Some(&theirs))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
