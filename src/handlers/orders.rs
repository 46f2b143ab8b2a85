use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::{Order, OrderStatus, Variant, VariantSelector},
    services::Buyer,
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    /// Kind-specific key plus license, e.g. `{"kind":"image","size":"SQUARE","license":"personal"}`
    #[schema(value_type = Object)]
    pub variant_selector: VariantSelector,
}

/// Everything the checkout widget needs to open a payment for the order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    /// Minor units, taken from the catalog
    pub amount: i64,
    pub currency: String,
    pub gateway_key_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub reference: String,
    #[schema(value_type = String, example = "pending")]
    pub status: OrderStatus,
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(value_type = Object)]
    pub variant: Variant,
    pub amount: i64,
    pub currency: String,
    pub gateway_order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_payment_id: Option<String>,
    pub needs_review: bool,
    /// Only present once the order is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let download_url = match order.status {
            OrderStatus::Completed => order.download_url.clone(),
            _ => None,
        };
        Self {
            reference: order.reference(),
            id: order.id,
            status: order.status,
            product_id: order.product_id,
            product_name: order.product_name,
            variant: order.variant,
            amount: order.amount_minor_units,
            currency: order.currency,
            gateway_order_id: order.gateway_order_id,
            gateway_payment_id: order.gateway_payment_id,
            needs_review: order.needs_review,
            download_url,
            preview_url: order.preview_url,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Create a pending order for one product variant
#[utoipa::path(
    post,
    path = "/orders",
    summary = "Create order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Pending order created", body = CreateOrderResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Malformed request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
        (status = 422, description = "No such purchasable variant", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway unavailable", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(request) = payload.map_err(|e| ServiceError::ValidationError(e.body_text()))?;
    let buyer = Buyer::from(user);

    let created = state
        .services
        .orders
        .create_order(Some(&buyer), request.product_id, &request.variant_selector)
        .await?;

    let body = CreateOrderResponse {
        order_id: created.order.id,
        gateway_order_id: created.gateway_order_id,
        amount: created.order.amount_minor_units,
        currency: created.order.currency,
        gateway_key_id: state.config.payment_gateway_key_id.clone(),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// List the caller's orders, newest first
#[utoipa::path(
    get,
    path = "/orders",
    summary = "List my orders",
    responses(
        (status = 200, description = "Orders retrieved", body = [OrderResponse]),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    let buyer = Buyer::from(user);
    let orders = state.services.orders.list_orders(Some(&buyer)).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    summary = "Get one of my orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = OrderResponse),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let buyer = Buyer::from(user);
    let order = state.services.orders.get_order(Some(&buyer), id).await?;
    Ok(Json(order.into()))
}
