use axum::{Json, extract::State, response::IntoResponse};

use crate::state::SharedState;

// health handler
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
