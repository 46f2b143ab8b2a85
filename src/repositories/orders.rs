use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use super::{BaseRepository, Repository};
use crate::entities::order::{self, Column, Entity as OrderEntity};
use crate::errors::ServiceError;
use crate::models::{Order, OrderPatch, OrderStatus};

/// Persistence for orders. Status changes go through
/// [`OrderRepository::compare_and_swap_status`] only.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order. A duplicate `gateway_order_id` is a `Conflict`.
    async fn insert(&self, order: Order) -> Result<Order, ServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, ServiceError>;

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, ServiceError>;

    /// Orders placed by `buyer_id`, newest first.
    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, ServiceError>;

    /// Moves `order_id` from `expected` to `new` in one conditional write.
    /// Returns `false` when the order was not in `expected` (or is missing).
    async fn compare_and_swap_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        new: OrderStatus,
        patch: OrderPatch,
    ) -> Result<bool, ServiceError>;

    /// Marks a still-pending order for manual review.
    async fn flag_for_review(&self, order_id: Uuid, reason: &str) -> Result<bool, ServiceError>;
}

fn to_domain(model: order::Model) -> Result<Order, ServiceError> {
    let status = model.status.parse::<OrderStatus>().map_err(|_| {
        ServiceError::Internal(format!(
            "order {} has unknown status {}",
            model.id, model.status
        ))
    })?;
    Ok(Order {
        id: model.id,
        buyer_id: model.buyer_id,
        buyer_email: model.buyer_email,
        product_id: model.product_id,
        product_name: model.product_name,
        variant: serde_json::from_value(model.variant)?,
        amount_minor_units: model.amount_minor_units,
        currency: model.currency,
        gateway_order_id: model.gateway_order_id,
        gateway_payment_id: model.gateway_payment_id,
        status,
        needs_review: model.needs_review,
        review_reason: model.review_reason,
        download_url: model.download_url,
        preview_url: model.preview_url,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

fn to_active_model(order: &Order) -> Result<order::ActiveModel, ServiceError> {
    Ok(order::ActiveModel {
        id: Set(order.id),
        buyer_id: Set(order.buyer_id.clone()),
        buyer_email: Set(order.buyer_email.clone()),
        product_id: Set(order.product_id),
        product_name: Set(order.product_name.clone()),
        variant: Set(serde_json::to_value(&order.variant)?),
        amount_minor_units: Set(order.amount_minor_units),
        currency: Set(order.currency.clone()),
        gateway_order_id: Set(order.gateway_order_id.clone()),
        gateway_payment_id: Set(order.gateway_payment_id.clone()),
        status: Set(order.status.to_string()),
        needs_review: Set(order.needs_review),
        review_reason: Set(order.review_reason.clone()),
        download_url: Set(order.download_url.clone()),
        preview_url: Set(order.preview_url.clone()),
        created_at: Set(order.created_at),
        updated_at: Set(order.updated_at),
    })
}

fn map_insert_error(err: DbErr, gateway_order_id: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!(
            "an order already exists for gateway order {}",
            gateway_order_id
        )),
        _ => ServiceError::from(err),
    }
}

/// Repository for orders backed by the injected sea-orm pool.
#[derive(Debug, Clone)]
pub struct SeaOrmOrderRepository {
    base: BaseRepository,
}

impl SeaOrmOrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    #[instrument(skip(self, order), fields(order_id = %order.id, gateway_order_id = %order.gateway_order_id))]
    async fn insert(&self, order: Order) -> Result<Order, ServiceError> {
        let model = to_active_model(&order)?
            .insert(self.base.get_db())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to insert order");
                map_insert_error(e, &order.gateway_order_id)
            })?;
        to_domain(model)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, ServiceError> {
        OrderEntity::find_by_id(id)
            .one(self.base.get_db())
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, ServiceError> {
        OrderEntity::find()
            .filter(Column::GatewayOrderId.eq(gateway_order_id))
            .one(self.base.get_db())
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, ServiceError> {
        OrderEntity::find()
            .filter(Column::BuyerId.eq(buyer_id))
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    #[instrument(skip(self, patch))]
    async fn compare_and_swap_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        new: OrderStatus,
        patch: OrderPatch,
    ) -> Result<bool, ServiceError> {
        let mut update = OrderEntity::update_many()
            .col_expr(Column::Status, Expr::value(new.to_string()))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()));
        if new == OrderStatus::Completed {
            update = update.col_expr(
                Column::GatewayPaymentId,
                Expr::value(patch.gateway_payment_id),
            );
        }

        let result = update
            .filter(Column::Id.eq(order_id))
            .filter(Column::Status.eq(expected.to_string()))
            .exec(self.base.get_db())
            .await?;

        debug!(rows_affected = result.rows_affected, "Conditional status update");
        Ok(result.rows_affected == 1)
    }

    #[instrument(skip(self))]
    async fn flag_for_review(&self, order_id: Uuid, reason: &str) -> Result<bool, ServiceError> {
        let result = OrderEntity::update_many()
            .col_expr(Column::NeedsReview, Expr::value(true))
            .col_expr(Column::ReviewReason, Expr::value(reason.to_string()))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(order_id))
            .filter(Column::Status.eq(OrderStatus::Pending.to_string()))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected == 1)
    }
}

/// In-process order store for tests and local demos.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<Uuid, Order>,
    by_gateway_order_id: DashMap<String, Uuid>,
    unavailable: AtomicBool,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `RepositoryUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn ensure_available(&self) -> Result<(), ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::RepositoryUnavailable(
                "in-memory order store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: Order) -> Result<Order, ServiceError> {
        self.ensure_available()?;
        match self.by_gateway_order_id.entry(order.gateway_order_id.clone()) {
            Entry::Occupied(_) => Err(ServiceError::Conflict(format!(
                "an order already exists for gateway order {}",
                order.gateway_order_id
            ))),
            Entry::Vacant(slot) => {
                self.orders.insert(order.id, order.clone());
                slot.insert(order.id);
                Ok(order)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, ServiceError> {
        self.ensure_available()?;
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, ServiceError> {
        self.ensure_available()?;
        let id = match self.by_gateway_order_id.get(gateway_order_id) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, ServiceError> {
        self.ensure_available()?;
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.buyer_id == buyer_id)
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn compare_and_swap_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        new: OrderStatus,
        patch: OrderPatch,
    ) -> Result<bool, ServiceError> {
        self.ensure_available()?;
        // The shard write lock makes check-and-set atomic.
        Ok(match self.orders.get_mut(&order_id) {
            Some(mut order) => order.apply_transition(expected, new, &patch),
            None => false,
        })
    }

    async fn flag_for_review(&self, order_id: Uuid, reason: &str) -> Result<bool, ServiceError> {
        self.ensure_available()?;
        Ok(match self.orders.get_mut(&order_id) {
            Some(mut order) if order.status == OrderStatus::Pending => {
                order.needs_review = true;
                order.review_reason = Some(reason.to_string());
                order.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }
}
