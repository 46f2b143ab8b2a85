use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Mutex,
};
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Context attached to a remote payment intent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntentMetadata {
    pub product_id: Uuid,
    pub buyer_id: String,
    /// Merchant reference shown in the provider dashboard.
    pub receipt: String,
}

impl IntentMetadata {
    pub fn new(product_id: Uuid, buyer_id: impl Into<String>) -> Self {
        let stamp = Uuid::new_v4().simple().to_string();
        Self {
            product_id,
            buyer_id: buyer_id.into(),
            // Provider caps receipts at 40 characters.
            receipt: format!("receipt_{}", &stamp[..24]),
        }
    }
}

/// Remote payment intent minted by the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayIntent {
    pub gateway_order_id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote intent for exactly `amount_minor_units` of `currency`.
    /// Any failure is reported as `GatewayUnavailable`.
    async fn create_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, ServiceError>;
}

#[derive(Clone)]
pub struct GatewayCredentials {
    pub key_id: String,
    pub key_secret: String,
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: CreateOrderNotes<'a>,
}

#[derive(Debug, Serialize)]
struct CreateOrderNotes<'a> {
    product_id: String,
    buyer_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

/// Client for the provider's Orders API (`POST /v1/orders`).
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    credentials: GatewayCredentials,
}

impl HttpPaymentGateway {
    pub fn new(
        base_url: impl Into<String>,
        credentials: GatewayCredentials,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("failed to build gateway client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, metadata), fields(receipt = %metadata.receipt))]
    async fn create_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, ServiceError> {
        let body = CreateOrderBody {
            amount: amount_minor_units,
            currency,
            receipt: &metadata.receipt,
            notes: CreateOrderNotes {
                product_id: metadata.product_id.to_string(),
                buyer_id: &metadata.buyer_id,
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.credentials.key_id, Some(&self.credentials.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Payment gateway request failed");
                ServiceError::GatewayUnavailable(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "Payment gateway rejected intent");
            return Err(ServiceError::GatewayUnavailable(format!(
                "gateway returned {}: {}",
                status, detail
            )));
        }

        let created: CreateOrderResponse = response.json().await.map_err(|e| {
            ServiceError::GatewayUnavailable(format!("unreadable gateway response: {}", e))
        })?;

        if created.amount != amount_minor_units || !created.currency.eq_ignore_ascii_case(currency)
        {
            error!(
                gateway_order_id = %created.id,
                requested = amount_minor_units,
                echoed = created.amount,
                "Gateway echoed a different amount or currency"
            );
            return Err(ServiceError::GatewayUnavailable(
                "gateway echoed a different amount or currency".to_string(),
            ));
        }

        info!(gateway_order_id = %created.id, "Payment intent created");
        Ok(GatewayIntent {
            gateway_order_id: created.id,
        })
    }
}

/// One `create_intent` call seen by [`SandboxPaymentGateway`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SandboxCall {
    pub amount_minor_units: i64,
    pub currency: String,
    pub metadata: IntentMetadata,
}

/// Offline gateway for development without provider credentials. Ids can be
/// scripted; failures and latency can be switched on.
#[derive(Debug, Default)]
pub struct SandboxPaymentGateway {
    scripted_ids: Mutex<VecDeque<String>>,
    sequence: AtomicU64,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<SandboxCall>>,
}

impl SandboxPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids handed out, in order, before falling back to generated ones.
    pub fn with_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut scripted) = self.scripted_ids.lock() {
            scripted.extend(ids.into_iter().map(Into::into));
        }
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        if let Ok(mut slot) = self.delay.lock() {
            *slot = delay;
        }
    }

    pub fn calls(&self) -> Vec<SandboxCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for SandboxPaymentGateway {
    async fn create_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<GatewayIntent, ServiceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(SandboxCall {
                amount_minor_units,
                currency: currency.to_string(),
                metadata: metadata.clone(),
            });
        }

        let delay = self.delay.lock().ok().and_then(|slot| *slot);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::GatewayUnavailable(
                "sandbox gateway is failing".to_string(),
            ));
        }

        let scripted = self
            .scripted_ids
            .lock()
            .ok()
            .and_then(|mut ids| ids.pop_front());
        let gateway_order_id = scripted.unwrap_or_else(|| {
            let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            format!("order_sandbox_{:06}", n)
        });
        Ok(GatewayIntent { gateway_order_id })
    }
}
