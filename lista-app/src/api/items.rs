//! Item endpoints
//!
//! Listing, image URLs, submit (crop + ad definition + archive input) and
//! discard (archive input without an ad).

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info};

use super::item_by_id;
use crate::models::SubmitPayload;
use crate::services::crop_selections;
use crate::services::image_cropper::MEDIA_PREFIX;
use crate::{ApiResult, AppState};
use lista_common::fs_utils::safe_relative_path;

#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub id: usize,
    pub name: String,
    #[serde(rename = "imageCount")]
    pub image_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Serialize)]
pub struct ItemRef {
    pub id: usize,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ItemImagesResponse {
    pub item: ItemRef,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub ad_file: String,
    pub cropped: Vec<String>,
    #[serde(rename = "nextItemId")]
    pub next_item_id: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DeleteInputResponse {
    pub ok: bool,
    /// False when the folder was already archived
    pub archived: bool,
}

/// GET /api/items
///
/// Rescans the input root; ids refer to this fresh snapshot.
pub async fn list_items(State(state): State<AppState>) -> ApiResult<Json<ItemsResponse>> {
    let items = state.items.refresh().await?;

    let mut summaries = Vec::with_capacity(items.len());
    for item in items {
        let image_count = state.items.images(&item)?.len();
        summaries.push(ItemSummary {
            id: item.id,
            name: item.name,
            image_count,
        });
    }

    Ok(Json(ItemsResponse { items: summaries }))
}

/// GET /api/items/:id/images
pub async fn item_images(
    State(state): State<AppState>,
    Path(item_id): Path<usize>,
) -> ApiResult<Json<ItemImagesResponse>> {
    let item = item_by_id(&state, item_id).await?;
    let images = state
        .items
        .images(&item)?
        .into_iter()
        .map(|rel| format!("{}{}", MEDIA_PREFIX, rel))
        .collect();

    Ok(Json(ItemImagesResponse {
        item: ItemRef {
            id: item.id,
            name: item.name,
        },
        images,
    }))
}

/// POST /api/items/:id/submit
///
/// **Behavior:**
/// 1. Crop the selections (in `image_order` if given) into the pending ad folder
/// 2. Write the ad definition
/// 3. Archive the item's input folder
///
/// **Errors:**
/// - 400 Bad Request: selection URL outside `/media/`
/// - 404 Not Found: unknown item or missing source image
pub async fn submit_item(
    State(state): State<AppState>,
    Path(item_id): Path<usize>,
    Json(payload): Json<SubmitPayload>,
) -> ApiResult<Json<SubmitResponse>> {
    let item = item_by_id(&state, item_id).await?;
    let _guard = state.fs_lock.lock().await;

    let ad_dir = state.ads.ad_dir_for(&item)?;
    let selections = payload.ordered_selections();
    let input_root = state.paths.input_dir.clone();
    let crop_dir = ad_dir.clone();
    let cropped =
        tokio::task::spawn_blocking(move || crop_selections(&input_root, &crop_dir, &selections))
            .await??;

    let ad_file = state.ads.write_ad(&item, &payload.metadata, &ad_dir)?;
    state.archive.archive(&item)?;

    if let Some(audio_id) = payload.audio_id.as_deref() {
        // Leftover from a drafting run that failed before cleanup
        if let Ok(rel) = safe_relative_path(audio_id) {
            let leftover = state.paths.audio_dir.join(rel);
            if leftover.is_file() && std::fs::remove_file(&leftover).is_ok() {
                debug!(audio = %audio_id, "Removed leftover audio");
            }
        }
    }

    let count = state.items.len().await;
    let next_item_id = (item.id + 1 < count).then_some(item.id + 1);

    info!(item = %item.name, images = cropped.len(), "Item submitted");
    Ok(Json(SubmitResponse {
        ok: true,
        ad_file: ad_file.display().to_string(),
        cropped: cropped.iter().map(|p| p.display().to_string()).collect(),
        next_item_id,
    }))
}

/// POST /api/items/:id/delete_input
///
/// Discards an item by archiving its input folder. Repeating the request is
/// harmless.
pub async fn delete_input(
    State(state): State<AppState>,
    Path(item_id): Path<usize>,
) -> ApiResult<Json<DeleteInputResponse>> {
    let item = item_by_id(&state, item_id).await?;
    let _guard = state.fs_lock.lock().await;

    let outcome = state.archive.archive(&item)?;
    Ok(Json(DeleteInputResponse {
        ok: true,
        archived: outcome.is_archived(),
    }))
}

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/api/items", get(list_items))
        .route("/api/items/:id/images", get(item_images))
        .route("/api/items/:id/submit", post(submit_item))
        .route("/api/items/:id/delete_input", post(delete_input))
}
