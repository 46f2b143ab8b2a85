#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use pixelkit_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    errors::ServiceError,
    handlers::AppServices,
    models::{
        DocumentFormat, DocumentVariant, ImageSize, ImageVariant, License, Product, Variant,
        VideoQuality, VideoVariant,
    },
    repositories::{InMemoryAnomalyRepository, InMemoryOrderRepository},
    services::{
        InMemoryCatalogStore, NotificationDispatcher, OrderIntentService, OrderSummary,
        SandboxPaymentGateway, WebhookReconciler,
    },
    webhooks::PaymentSignatureVerifier,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration_test_jwt_secret_0123456789abcdef";
pub const WEBHOOK_SECRET: &str = "whsec_integration_test_secret";
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Notification dispatcher that records every confirmation it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, OrderSummary)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, OrderSummary)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn send_purchase_confirmation(
        &self,
        buyer_contact: &str,
        summary: &OrderSummary,
    ) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((buyer_contact.to_string(), summary.clone()));
        Ok(())
    }
}

/// Application wired to in-memory stores, the sandbox gateway and a
/// recording notifier.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub catalog: Arc<InMemoryCatalogStore>,
    pub gateway: Arc<SandboxPaymentGateway>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub anomalies: Arc<InMemoryAnomalyRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub auth: Arc<AuthService>,
    verifier: PaymentSignatureVerifier,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(SandboxPaymentGateway::new())
    }

    pub fn with_gateway(gateway: SandboxPaymentGateway) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            JWT_SECRET.to_string(),
            WEBHOOK_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.payment_gateway_key_id = "rzp_test_key".to_string();
        cfg.payment_gateway_timeout_ms = 300;

        let catalog = Arc::new(InMemoryCatalogStore::new());
        let gateway = Arc::new(gateway);
        let orders = Arc::new(InMemoryOrderRepository::new());
        let anomalies = Arc::new(InMemoryAnomalyRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let verifier =
            PaymentSignatureVerifier::new(WEBHOOK_SECRET).expect("valid webhook secret");

        let services = AppServices {
            orders: Arc::new(OrderIntentService::new(
                catalog.clone(),
                gateway.clone(),
                orders.clone(),
                cfg.payment_gateway_timeout(),
            )),
            reconciler: Arc::new(WebhookReconciler::new(
                verifier.clone(),
                orders.clone(),
                anomalies.clone(),
                notifier.clone(),
                Duration::from_millis(500),
            )),
        };

        let auth = Arc::new(AuthService::new(
            AuthConfig::new(
                cfg.jwt_secret.clone(),
                cfg.auth_issuer.clone(),
                cfg.auth_audience.clone(),
                Duration::from_secs(3600),
            )
            .expect("valid auth config for tests"),
        ));

        let state = AppState {
            config: Arc::new(cfg),
            services,
            auth: auth.clone(),
            db: None,
        };
        let router = pixelkit_api::app(state.clone());

        Self {
            router,
            state,
            catalog,
            gateway,
            orders,
            anomalies,
            notifier,
            auth,
            verifier,
        }
    }

    /// Bearer token for `buyer_id` with a contact email.
    pub fn token_for(&self, buyer_id: &str) -> String {
        self.auth
            .issue_token(buyer_id, Some(&format!("{buyer_id}@example.com")), None)
            .expect("issue test token")
    }

    /// Seeds a product with one image, one video and one document variant.
    pub fn seed_product(&self) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Neon Skyline".to_string(),
            currency: "USD".to_string(),
            variants: vec![
                Variant::Image(ImageVariant {
                    size: ImageSize::Square,
                    price: 999,
                    license: License::Personal,
                }),
                Variant::Video(VideoVariant {
                    quality: VideoQuality::Uhd4k,
                    duration_secs: 30,
                    price: 4999,
                    license: License::Commercial,
                }),
                Variant::Document(DocumentVariant {
                    format: DocumentFormat::Pdf,
                    pages: Some(48),
                    price: 1499,
                    license: License::Extended,
                }),
            ],
            active: true,
        };
        self.catalog.upsert(product.clone());
        product
    }

    pub fn sign(&self, body: &[u8]) -> String {
        self.verifier.sign(body)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// POST /orders for `buyer_id` with the square personal image.
    pub async fn create_square_order(
        &self,
        buyer_id: &str,
        product_id: Uuid,
    ) -> axum::response::Response {
        let token = self.token_for(buyer_id);
        self.request(
            Method::POST,
            "/orders",
            Some(json!({
                "productId": product_id,
                "variantSelector": {"kind": "image", "size": "SQUARE", "license": "personal"}
            })),
            Some(&token),
        )
        .await
    }

    /// POST /webhooks/payment with the given raw body and signature header.
    pub async fn deliver_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/webhooks/payment")
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        let request = builder
            .body(Body::from(body.to_vec()))
            .expect("failed to build webhook request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during webhook request")
    }

    /// Delivers `body` with a valid signature.
    pub async fn deliver_signed(&self, body: &[u8]) -> axum::response::Response {
        let sig = self.sign(body);
        self.deliver_webhook(body, Some(&sig)).await
    }
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

/// Provider `payment.captured` event for `gateway_order_id`.
pub fn captured_event(gateway_order_id: &str, amount: i64, currency: &str) -> Vec<u8> {
    payment_event("payment.captured", gateway_order_id, amount, currency)
}

pub fn payment_event(event: &str, gateway_order_id: &str, amount: i64, currency: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "entity": "event",
        "event": event,
        "payload": {"payment": {"entity": {
            "id": "pay_1",
            "order_id": gateway_order_id,
            "amount": amount,
            "currency": currency,
            "status": "captured"
        }}}
    }))
    .expect("serialize webhook body")
}
