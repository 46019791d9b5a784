//! Health check handler.

use axum::Json;
use axum::extract::State;
use chrono::Utc;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// Product features advertised to clients.
pub const FEATURES: &[&str] = &[
    "Chat Requests",
    "Block Users",
    "Incognito Mode",
    "Real-time Messaging",
    "File Sharing",
    "Video Calls",
];

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        online_users: state.realtime.registry.user_count(),
        realtime: state.realtime.metrics_snapshot(),
        features: FEATURES.iter().map(|f| f.to_string()).collect(),
    }))
}
