use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{NewOrder, Order, VariantSelector};
use crate::repositories::OrderRepository;
use crate::services::catalog::CatalogStore;
use crate::services::payment_gateway::{IntentMetadata, PaymentGateway};
use crate::tracing::with_metrics;

/// Authenticated purchaser as seen by the service layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buyer {
    pub buyer_id: String,
    pub email: Option<String>,
}

impl Buyer {
    pub fn new(buyer_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            buyer_id: buyer_id.into(),
            email,
        }
    }
}

impl From<crate::auth::AuthUser> for Buyer {
    fn from(user: crate::auth::AuthUser) -> Self {
        Self {
            buyer_id: user.user_id,
            email: user.email,
        }
    }
}

/// A stored `pending` order plus the remote intent the client pays against.
#[derive(Clone, Debug)]
pub struct CreatedOrder {
    pub order: Order,
    pub gateway_order_id: String,
}

/// Turns a buyer's variant choice into a priced `pending` order backed by a
/// remote payment intent.
pub struct OrderIntentService {
    catalog: Arc<dyn CatalogStore>,
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderRepository>,
    gateway_timeout: Duration,
}

impl OrderIntentService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderRepository>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            gateway,
            orders,
            gateway_timeout,
        }
    }

    fn authenticated(buyer: Option<&Buyer>) -> Result<&Buyer, ServiceError> {
        buyer
            .filter(|b| !b.buyer_id.trim().is_empty())
            .ok_or_else(|| ServiceError::Unauthenticated("sign in to purchase".to_string()))
    }

    /// Creates a `pending` order priced from the catalog.
    #[instrument(skip(self, buyer, selector), fields(%product_id, selector = %selector))]
    pub async fn create_order(
        &self,
        buyer: Option<&Buyer>,
        product_id: Uuid,
        selector: &VariantSelector,
    ) -> Result<CreatedOrder, ServiceError> {
        let buyer = Self::authenticated(buyer)?;
        let resolved = self.catalog.get_variant(product_id, selector).await?;
        let amount = resolved.variant.price();
        let metadata = IntentMetadata::new(product_id, buyer.buyer_id.clone());

        let gateway = Arc::clone(&self.gateway);
        let intent = with_metrics("payment_gateway_create_intent", || async {
            match tokio::time::timeout(
                self.gateway_timeout,
                gateway.create_intent(amount, &resolved.currency, &metadata),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ServiceError::GatewayUnavailable(format!(
                    "no response within {}ms",
                    self.gateway_timeout.as_millis()
                ))),
            }
        })
        .await
        .map_err(|e| match e {
            e @ ServiceError::GatewayUnavailable(_) => e,
            other => ServiceError::GatewayUnavailable(other.to_string()),
        })?;

        let order = Order::new_pending(NewOrder {
            buyer_id: buyer.buyer_id.clone(),
            buyer_email: buyer.email.clone(),
            product_id: resolved.product_id,
            product_name: resolved.product_name,
            variant: resolved.variant,
            currency: resolved.currency,
            gateway_order_id: intent.gateway_order_id.clone(),
        });

        let order = match self.orders.insert(order).await {
            Ok(order) => order,
            Err(e) => {
                warn!(
                    gateway_order_id = %intent.gateway_order_id,
                    error = %e,
                    "Remote intent created but order could not be stored"
                );
                return Err(e);
            }
        };

        counter!("orders_created_total", 1);
        info!(
            order_id = %order.id,
            gateway_order_id = %order.gateway_order_id,
            amount = order.amount_minor_units,
            currency = %order.currency,
            "Pending order created"
        );

        Ok(CreatedOrder {
            gateway_order_id: intent.gateway_order_id,
            order,
        })
    }

    /// The buyer's orders, newest first.
    pub async fn list_orders(&self, buyer: Option<&Buyer>) -> Result<Vec<Order>, ServiceError> {
        let buyer = Self::authenticated(buyer)?;
        self.orders.list_by_buyer(&buyer.buyer_id).await
    }

    /// Another buyer's order is indistinguishable from a missing one.
    pub async fn get_order(
        &self,
        buyer: Option<&Buyer>,
        order_id: Uuid,
    ) -> Result<Order, ServiceError> {
        let buyer = Self::authenticated(buyer)?;
        self.orders
            .find_by_id(order_id)
            .await?
            .filter(|order| order.buyer_id == buyer.buyer_id)
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))
    }
}
