//! Archive maintenance endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::io::ErrorKind;
use tracing::{info, warn};

use crate::{ApiResult, AppState};
use lista_common::fs_utils::{clear_dir_contents, dir_size, format_bytes, SizeReport};

#[derive(Debug, Serialize)]
pub struct ArchiveInfoResponse {
    pub bytes: u64,
    pub human: String,
    /// Paths left out of the total because they could not be read
    pub skipped: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SkippedEntry {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ArchiveClearResponse {
    pub ok: bool,
    pub removed: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// GET /api/archive/info
///
/// Combined size of both archives and the publisher log.
pub async fn archive_info(State(state): State<AppState>) -> ApiResult<Json<ArchiveInfoResponse>> {
    let paths = state.paths.clone();
    let report = tokio::task::spawn_blocking(move || {
        let mut report = SizeReport::default();
        report.merge(dir_size(&paths.ads_archive_dir));
        report.merge(dir_size(&paths.input_archive_dir));
        match std::fs::metadata(&paths.publisher_log) {
            Ok(meta) => report.bytes += meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(_) => report.skipped.push(paths.publisher_log.clone()),
        }
        report
    })
    .await?;

    Ok(Json(ArchiveInfoResponse {
        bytes: report.bytes,
        human: format_bytes(report.bytes),
        skipped: report
            .skipped
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    }))
}

/// POST /api/archive/clear
///
/// Empties both archives and deletes the publisher log. Best-effort:
/// entries that cannot be removed are reported, not fatal.
pub async fn archive_clear(State(state): State<AppState>) -> ApiResult<Json<ArchiveClearResponse>> {
    let _guard = state.fs_lock.lock().await;
    let paths = state.paths.clone();

    let (removed, skipped) = tokio::task::spawn_blocking(move || {
        let mut removed = 0;
        let mut skipped = Vec::new();
        for dir in [&paths.ads_archive_dir, &paths.input_archive_dir] {
            let report = clear_dir_contents(dir);
            removed += report.removed;
            skipped.extend(report.skipped);
        }
        match std::fs::remove_file(&paths.publisher_log) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %paths.publisher_log.display(), error = %e, "Failed to delete publisher log");
                skipped.push((paths.publisher_log.clone(), e.to_string()));
            }
        }
        (removed, skipped)
    })
    .await?;

    info!(removed, skipped = skipped.len(), "Cleared archives");
    Ok(Json(ArchiveClearResponse {
        ok: true,
        removed,
        skipped: skipped
            .into_iter()
            .map(|(path, error)| SkippedEntry {
                path: path.display().to_string(),
                error,
            })
            .collect(),
    }))
}

pub fn archive_routes() -> Router<AppState> {
    Router::new()
        .route("/api/archive/info", get(archive_info))
        .route("/api/archive/clear", post(archive_clear))
}
