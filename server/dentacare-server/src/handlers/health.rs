use crate::error::{api_success, ApiResponse};
use crate::server::ClinicServer;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::collections::BTreeMap;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC3339 format
    pub timestamp: String,
    pub version: String,
    /// Seconds since the server started
    pub uptime: u64,
    /// Individual dependency checks
    pub checks: BTreeMap<String, String>,
}

/// Liveness check.
pub async fn ping() -> Json<ApiResponse<&'static str>> {
    Json(api_success("pong", "pong"))
}

/// Readiness check; answers 503 when the database is unreachable.
pub async fn health_check(State(server): State<ClinicServer>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let database_ok = server.database_healthy().await;

    let mut checks = BTreeMap::new();
    let database_state = match (&server.pool, database_ok) {
        (None, _) => "in-memory",
        (Some(_), true) => "healthy",
        (Some(_), false) => "unhealthy",
    };
    checks.insert("database".to_string(), database_state.to_string());

    let (status_code, status) = if database_ok {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.started_at.elapsed().as_secs(),
        checks,
    };

    (status_code, Json(api_success(format!("System is {}", status), response)))
}
