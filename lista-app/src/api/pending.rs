//! Pending ad endpoints: list, publish, undo

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::models::{PendingAd, UndoPayload};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub pending: Vec<PendingAd>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PublishResponse {
    /// Nothing to publish
    Idle {
        ok: bool,
        published: bool,
        message: String,
    },
    /// Publisher ran
    Ran {
        ok: bool,
        returncode: Option<i32>,
        stdout: String,
        stderr: String,
        published: bool,
        /// Ad folders moved into the archive
        promoted: usize,
    },
}

#[derive(Debug, Serialize)]
pub struct UndoResponse {
    pub ok: bool,
    pub restored: bool,
}

#[derive(Debug, Serialize)]
pub struct UndoAllResponse {
    pub ok: bool,
    pub count: usize,
    pub restored: usize,
}

/// GET /api/pending
pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<PendingResponse>> {
    Ok(Json(PendingResponse {
        pending: state.ads.list_pending()?,
    }))
}

/// POST /api/publish_all
///
/// Runs the publisher once for every pending ad. On exit code 0 all pending
/// ad folders are promoted into the ad archive; otherwise they stay pending.
pub async fn publish_all(State(state): State<AppState>) -> ApiResult<Json<PublishResponse>> {
    let _guard = state.fs_lock.lock().await;

    if state.ads.list_pending()?.is_empty() {
        return Ok(Json(PublishResponse::Idle {
            ok: true,
            published: false,
            message: "No pending ads.".to_string(),
        }));
    }

    let outcome = state.publisher.publish().await?;
    let published = outcome.success();

    let promoted = if published {
        state.clear_error().await;
        let report = state.ads.promote_all()?;
        info!(
            moved = report.moved.len(),
            merged = report.merged.len(),
            renamed = report.renamed.len(),
            "Promoted published ads"
        );
        report.moved.len() + report.merged.len()
    } else {
        state
            .record_error(format!("Publisher exited with {:?}", outcome.exit_code))
            .await;
        0
    };

    Ok(Json(PublishResponse::Ran {
        ok: published,
        returncode: outcome.exit_code,
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        published,
        promoted,
    }))
}

/// Relative ad folder from an undo request, without surrounding slashes
fn undo_dir(raw: &str) -> ApiResult<&str> {
    let rel = raw.trim().trim_matches('/');
    if rel.is_empty() {
        return Err(ApiError::BadRequest("Missing ad directory".to_string()));
    }
    Ok(rel)
}

/// POST /api/pending/undo
///
/// Drops a pending ad and moves its input folder back out of the archive.
/// `restored` is false when no archived input exists for it.
pub async fn undo_pending(
    State(state): State<AppState>,
    Json(payload): Json<UndoPayload>,
) -> ApiResult<Json<UndoResponse>> {
    let rel = undo_dir(&payload.dir)?;
    let _guard = state.fs_lock.lock().await;

    state.ads.remove_pending(rel)?;
    let restored = state.archive.restore(rel)?;

    info!(dir = %rel, restored, "Undid pending ad");
    Ok(Json(UndoResponse { ok: true, restored }))
}

/// POST /api/pending/undo_all
pub async fn undo_all(State(state): State<AppState>) -> ApiResult<Json<UndoAllResponse>> {
    let _guard = state.fs_lock.lock().await;

    let entries = state.ads.list_pending()?;
    let mut restored = 0;
    for entry in &entries {
        let rel = entry.dir.trim().trim_matches('/');
        if rel.is_empty() {
            continue;
        }
        state.ads.remove_pending(rel)?;
        if state.archive.restore(rel)? {
            restored += 1;
        }
    }

    info!(count = entries.len(), restored, "Undid all pending ads");
    Ok(Json(UndoAllResponse {
        ok: true,
        count: entries.len(),
        restored,
    }))
}

pub fn pending_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pending", get(list_pending))
        .route("/api/publish_all", post(publish_all))
        .route("/api/pending/undo", post(undo_pending))
        .route("/api/pending/undo_all", post(undo_all))
}
