use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::app::AppState;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

/// GET / - application settings, plus the caller when a valid token is sent
pub async fn root(
    State(state): State<AppState>,
    caller: Option<CurrentUser>,
) -> ApiResult<serde_json::Value> {
    let config = &state.config;
    let user = caller.map(|CurrentUser(user)| {
        json!({ "id": user.id, "email": user.email, "role": user.role })
    });
    Ok(ApiResponse::success(json!({
        "name": config.app.name,
        "version": config.app.version,
        "environment": config.environment,
        "debug": config.app.debug,
        "user": user,
    })))
}

/// GET /health - store ping
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": { "status": "degraded", "timestamp": now, "database": "unavailable" }
                })),
            )
        }
    }
}
