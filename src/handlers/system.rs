use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Sheets API (Rust)",
            "version": version,
            "description": "REST access to spreadsheet tables, scoped per user and project",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "tables": "/:username/:project/:table?key=<api key>[&filter=[attribute]value]",
            },
            "methods": {
                "GET": "list rows matching the filters",
                "POST": "append an array of row objects",
                "PATCH": "update rows matching at least one filter",
                "DELETE": "delete rows matching the filters",
            }
        }
    }))
}

/// GET /health - liveness plus identity provider reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.identity.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "identity": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "identity provider unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
