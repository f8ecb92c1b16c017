//! UI configuration endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AccessibilityResponse {
    pub accessibility: bool,
}

/// GET /api/config/accessibility
pub async fn get_accessibility(State(state): State<AppState>) -> Json<AccessibilityResponse> {
    Json(AccessibilityResponse {
        accessibility: state.accessibility_mode,
    })
}

pub fn config_routes() -> Router<AppState> {
    Router::new().route("/api/config/accessibility", get(get_accessibility))
}
