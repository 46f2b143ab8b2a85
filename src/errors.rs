use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unprocessable Entity",
    "message": "Invalid variant: no video variant with quality 4K and license extended",
    "request_id": "req-abc123xyz",
    "timestamp": "2025-03-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid variant: {0}")]
    InvalidVariant(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Webhook authenticity failure. Carries no detail so that nothing about
    /// the expected signature can reach logs or responses.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Unknown order for gateway order id {0}")]
    UnknownOrder(String),

    #[error(
        "Amount mismatch: expected {expected_amount} {expected_currency}, received {received_amount} {received_currency}"
    )]
    AmountMismatch {
        expected_amount: i64,
        expected_currency: String,
        received_amount: i64,
        received_currency: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        ServiceError::RepositoryUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) | Self::UnknownOrder(_) => StatusCode::NOT_FOUND,
            Self::InvalidVariant(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ValidationError(_) | Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::GatewayUnavailable(_) | Self::NotificationFailed(_) => StatusCode::BAD_GATEWAY,
            Self::AmountMismatch { .. } | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RepositoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SerializationError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Upstream and storage errors return generic messages to avoid leaking details.
    pub fn response_message(&self) -> String {
        match self {
            Self::RepositoryUnavailable(_) => "Storage temporarily unavailable".to_string(),
            Self::GatewayUnavailable(_) => "Payment gateway unavailable".to_string(),
            Self::NotificationFailed(_) => "Notification relay unavailable".to_string(),
            Self::SerializationError(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the provider should retry a webhook that failed with this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RepositoryUnavailable(_))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
