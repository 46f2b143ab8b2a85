use axum::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PixelKit Commerce API",
        version = "1.0.0",
        description = r#"
# PixelKit Commerce API

Order lifecycle for digital goods: buyers open a pending order for one
variant of an image, video or document product, pay through the payment
provider's checkout, and the provider's signed webhook completes the order.

## Authentication

Order endpoints take a session token issued by the PixelKit auth service:

```
Authorization: Bearer <your-jwt-token>
```

The payment webhook is authenticated by an HMAC-SHA256 signature over the raw
body instead.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Buyer order endpoints"),
        (name = "Payments", description = "Payment provider callbacks"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::payment_webhooks::payment_webhook,
        crate::handlers::health::liveness_check,
        crate::handlers::health::readiness_check,
    ),
    components(
        schemas(
            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::orders::CreateOrderResponse,
            crate::handlers::orders::OrderResponse,
            crate::handlers::payment_webhooks::WebhookAck,
            crate::services::Disposition,
            crate::handlers::health::LivenessResponse,
            crate::handlers::health::StatusResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// GET /openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}
