//! Inbox processing endpoint

use axum::{extract::State, routing::post, Json, Router};

use crate::services::SegmentReport;
use crate::{ApiResult, AppState};

/// POST /api/inbox/process
///
/// Segments whatever has arrived in the inbox since startup. Runs on the
/// blocking pool; image decoding is CPU-bound.
///
/// **Errors:**
/// - 409 Conflict: an item folder with the derived name already exists
/// - 500 Internal Server Error: an image could not be classified
pub async fn process_inbox(State(state): State<AppState>) -> ApiResult<Json<SegmentReport>> {
    let _guard = state.fs_lock.lock().await;

    let segmenter = state.segmenter();
    let result = tokio::task::spawn_blocking(move || segmenter.segment()).await?;

    match result {
        Ok(report) => {
            state.clear_error().await;
            state.items.refresh().await?;
            Ok(Json(report))
        }
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

pub fn inbox_routes() -> Router<AppState> {
    Router::new().route("/api/inbox/process", post(process_inbox))
}
