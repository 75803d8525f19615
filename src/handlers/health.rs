// handlers/health.rs - GET /healthz and GET /healthz/database

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use super::AppState;

pub async fn liveness() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 200 when the database answers, 503 when it does not, and `unknown` when
/// the server runs without a database checker.
pub async fn database(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(checker) = state.database_health.as_ref() else {
        return (StatusCode::OK, Json(json!({ "status": "unknown" })));
    };

    match checker.check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "error": e.to_string() })),
            )
        }
    }
}
