// Catalog lookups and outbound providers
pub mod catalog;
pub mod notifications;
pub mod payment_gateway;

// Order lifecycle
pub mod orders;
pub mod reconciler;

pub use catalog::{CatalogStore, InMemoryCatalogStore, ResolvedVariant, SeaOrmCatalogStore};
pub use notifications::{
    HttpNotificationDispatcher, LogNotificationDispatcher, NotificationDispatcher, OrderSummary,
};
pub use orders::{Buyer, CreatedOrder, OrderIntentService};
pub use payment_gateway::{
    GatewayCredentials, GatewayIntent, HttpPaymentGateway, IntentMetadata, PaymentGateway,
    SandboxPaymentGateway,
};
pub use reconciler::{Disposition, WebhookReconciler};
