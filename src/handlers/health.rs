use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::time::Instant;

use crate::AppState;

/// Liveness plus a database ping. Unauthenticated.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;

    match db_result {
        Ok(latency) => (
            StatusCode::OK,
            Json(json!({
                "status": "up",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "checks": {
                    "database": {
                        "status": "up",
                        "latency_ms": latency.as_millis() as u64
                    }
                },
                "response_time_ms": start.elapsed().as_millis() as u64
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "down",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "checks": {
                    "database": {
                        "status": "down",
                        "error": e.to_string()
                    }
                },
                "response_time_ms": start.elapsed().as_millis() as u64
            })),
        ),
    }
}
