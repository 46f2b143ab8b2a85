pub mod health;
pub mod orders;
pub mod payment_webhooks;

use std::sync::Arc;
use tracing::warn;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::repositories::{SeaOrmAnomalyRepository, SeaOrmOrderRepository};
use crate::services::{
    CatalogStore, GatewayCredentials, HttpNotificationDispatcher, HttpPaymentGateway,
    LogNotificationDispatcher, NotificationDispatcher, OrderIntentService, PaymentGateway,
    SandboxPaymentGateway, SeaOrmCatalogStore, WebhookReconciler,
};
use crate::webhooks::PaymentSignatureVerifier;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderIntentService>,
    pub reconciler: Arc<WebhookReconciler>,
}

impl AppServices {
    /// Wires the database-backed stores and the configured providers.
    pub fn new(config: &AppConfig, db: Arc<DbPool>) -> Result<Self, ServiceError> {
        let catalog: Arc<dyn CatalogStore> = Arc::new(SeaOrmCatalogStore::new(db.clone()));
        let order_repo = Arc::new(SeaOrmOrderRepository::new(db.clone()));
        let anomaly_repo = Arc::new(SeaOrmAnomalyRepository::new(db));

        let gateway: Arc<dyn PaymentGateway> = if config.payment_gateway_key_id.is_empty()
            || config.payment_gateway_key_secret.is_empty()
        {
            warn!("Payment gateway credentials not set; using the sandbox gateway");
            Arc::new(SandboxPaymentGateway::new())
        } else {
            Arc::new(HttpPaymentGateway::new(
                config.payment_gateway_base_url.clone(),
                GatewayCredentials {
                    key_id: config.payment_gateway_key_id.clone(),
                    key_secret: config.payment_gateway_key_secret.clone(),
                },
                config.payment_gateway_timeout(),
            )?)
        };

        let notifier: Arc<dyn NotificationDispatcher> = match &config.notification_relay_url {
            Some(url) => Arc::new(HttpNotificationDispatcher::new(
                url.clone(),
                config.notification_sender.clone(),
                config.notification_timeout(),
            )?),
            None => Arc::new(LogNotificationDispatcher),
        };

        let orders = Arc::new(OrderIntentService::new(
            catalog,
            gateway,
            order_repo.clone(),
            config.payment_gateway_timeout(),
        ));
        let reconciler = Arc::new(WebhookReconciler::new(
            PaymentSignatureVerifier::new(&config.payment_webhook_secret)?,
            order_repo,
            anomaly_repo,
            notifier,
            config.notification_timeout(),
        ));

        Ok(Self { orders, reconciler })
    }
}
