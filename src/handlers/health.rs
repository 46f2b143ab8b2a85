use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;

use crate::AppState;

/// Component health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LivenessResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub environment: String,
    pub storage: ComponentHealth,
    pub response_time_ms: u64,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Liveness probe: answers as long as the process is serving
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive", body = LivenessResponse)),
    tag = "Health"
)]
pub async fn liveness_check() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: ComponentStatus::Up,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: uptime_secs(),
    })
}

/// Readiness probe: checks the database when one is attached
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Ready to serve traffic", body = StatusResponse),
        (status = 503, description = "Storage unreachable", body = StatusResponse)
    ),
    tag = "Health"
)]
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let storage = match &state.db {
        Some(db) => {
            let check_start = Instant::now();
            let result = crate::db::check_connection(db).await;
            let latency_ms = Some(check_start.elapsed().as_millis() as u64);
            match result {
                Ok(()) => ComponentHealth {
                    status: ComponentStatus::Up,
                    message: "Connection successful".to_string(),
                    latency_ms,
                },
                Err(e) => ComponentHealth {
                    status: ComponentStatus::Down,
                    message: e.response_message(),
                    latency_ms,
                },
            }
        }
        None => ComponentHealth {
            status: ComponentStatus::Up,
            message: "In-memory stores".to_string(),
            latency_ms: None,
        },
    };

    let status_code = match storage.status {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    let body = StatusResponse {
        status: storage.status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        storage,
        response_time_ms: start.elapsed().as_millis() as u64,
    };
    (status_code, Json(body))
}
