//! Voice memo upload and drafting

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path as FsPath;
use tracing::{info, warn};

use super::item_by_id;
use crate::models::Draft;
use crate::{ApiError, ApiResult, AppState};

/// Upload limit for one recording
const MAX_AUDIO_BYTES: usize = 64 * 1024 * 1024;

/// Container produced by silence stripping
const PROCESSED_MIME: &str = "audio/webm";

const DEFAULT_EXTENSION: &str = ".webm";

#[derive(Debug, Serialize)]
pub struct AudioResponse {
    pub ok: bool,
    #[serde(rename = "audioId")]
    pub audio_id: String,
    pub draft: Draft,
}

/// Lower-cased extension of an uploaded file name, `.webm` if unusable
pub fn upload_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| FsPath::new(name).extension())
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// POST /api/audio/:id
///
/// **Request:** multipart form with a `file` field
/// **Response:** `{"ok": true, "audioId": "...", "draft": {...}}`
///
/// **Behavior:**
/// 1. Store the upload as `<id>-<millis><ext>` in the audio folder
/// 2. Strip silence into a temporary file and replace the upload with it
/// 3. Draft a listing from the processed recording
/// 4. Delete the recording, whether drafting succeeded or not
pub async fn upload_audio(
    State(state): State<AppState>,
    Path(item_id): Path<usize>,
    mut multipart: Multipart,
) -> ApiResult<Json<AudioResponse>> {
    let item = item_by_id(&state, item_id).await?;

    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    let millis = chrono::Utc::now().timestamp_millis();
    let audio_id = format!("{}-{}{}", item.id, millis, upload_extension(file_name.as_deref()));
    let dest = state.paths.audio_dir.join(&audio_id);
    let tmp = state.paths.audio_dir.join(format!("{}.tmp.webm", audio_id));

    tokio::fs::write(&dest, &bytes).await?;
    info!(item = %item.name, audio = %audio_id, bytes = bytes.len(), "Stored voice memo");

    let result = async {
        state.audio.strip_silence(&dest, &tmp).await?;
        tokio::fs::rename(&tmp, &dest).await?;
        let processed = tokio::fs::read(&dest).await?;
        let draft = state.drafter.draft(processed, PROCESSED_MIME).await?;
        Ok::<_, ApiError>(draft)
    }
    .await;

    for path in [&dest, &tmp] {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete voice memo"),
        }
    }

    let draft = match result {
        Ok(draft) => draft,
        Err(e) => {
            state.record_error(e.to_string()).await;
            return Err(e);
        }
    };

    Ok(Json(AudioResponse {
        ok: true,
        audio_id,
        draft,
    }))
}

pub fn audio_routes() -> Router<AppState> {
    Router::new()
        .route("/api/audio/:id", post(upload_audio))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES))
}
