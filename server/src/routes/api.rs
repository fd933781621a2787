use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let manifest = &state.manifest;
    let status = if manifest.data_errors.is_empty() {
        "ok"
    } else {
        "degraded"
    };
    Json(serde_json::json!({
        "status": status,
        "started_at": state.started_at.to_rfc3339(),
        "prefectures": manifest.prefectures.len(),
        "detail_layouts": manifest.detail_layouts.len(),
        "data_errors": manifest.data_errors,
    }))
}

/// Prefectures the client can drill into with a detail layer.
pub async fn manifest(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "prefectures": state.manifest.detail_layouts,
    }))
}
