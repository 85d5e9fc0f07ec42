/// Health check endpoint
use crate::{context::AppContext, db};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// "ok" or "unavailable"
    pub status: String,
    pub version: String,
    pub database: ComponentHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health))
}

/// Reports database reachability; 503 when the pool cannot answer
pub async fn health(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();
    let result = db::test_connection(&ctx.db).await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    let (status, database) = match result {
        Ok(()) => (
            StatusCode::OK,
            ComponentHealth {
                status: "healthy".to_string(),
                response_time_ms,
                error: None,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health_check_failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ComponentHealth {
                    status: "unhealthy".to_string(),
                    response_time_ms,
                    error: Some("database unreachable".to_string()),
                },
            )
        }
    };

    let health = HealthStatus {
        status: if status == StatusCode::OK { "ok" } else { "unavailable" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    };

    (status, Json(health))
}
