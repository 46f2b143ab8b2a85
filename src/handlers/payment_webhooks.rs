use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, Instrument, Span};
use utoipa::ToSchema;

use crate::services::Disposition;
use crate::tracing::{current_request_id, scope_request_id};
use crate::{errors::ServiceError, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    #[schema(value_type = String, example = "completed")]
    pub disposition: Disposition,
}

// POST /webhooks/payment
#[utoipa::path(
    post,
    path = "/webhooks/payment",
    request_body(content = String, description = "Raw provider event JSON", content_type = "application/json"),
    params(("x-razorpay-signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body")),
    responses(
        (status = 200, description = "Webhook acknowledged", body = WebhookAck),
        (status = 400, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 503, description = "Storage unavailable; retry later", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let signature = headers
        .get(state.config.payment_webhook_signature_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    // Detached so that a dropped provider connection cannot cancel a
    // half-applied callback.
    let reconciler = state.services.reconciler.clone();
    let request_id = current_request_id().unwrap_or_default();
    let task = tokio::spawn(
        scope_request_id(request_id, async move {
            reconciler.handle_callback(&body, signature.as_deref()).await
        })
        .instrument(Span::current()),
    );

    let disposition = task.await.map_err(|e| {
        error!(error = %e, "Webhook processing task aborted");
        ServiceError::Internal(format!("webhook task failed: {}", e))
    })??;

    Ok((
        StatusCode::OK,
        Json(WebhookAck {
            received: true,
            disposition,
        }),
    ))
}
