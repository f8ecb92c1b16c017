//! HTTP API handlers for lista-app
//!
//! JSON endpoints used by the single-page UI. Handlers that touch the
//! working tree take [`AppState::fs_lock`](crate::AppState) so that two
//! requests never reshuffle the same folders at once.

pub mod archive;
pub mod audio;
pub mod config;
pub mod health;
pub mod inbox;
pub mod items;
pub mod pending;
pub mod ui;

pub use archive::archive_routes;
pub use audio::audio_routes;
pub use config::config_routes;
pub use health::health_routes;
pub use inbox::inbox_routes;
pub use items::item_routes;
pub use pending::pending_routes;
pub use ui::ui_routes;

use crate::models::Item;
use crate::{ApiError, ApiResult, AppState};

/// Item by id from the current snapshot, or 404
pub(crate) async fn item_by_id(state: &AppState, id: usize) -> ApiResult<Item> {
    state
        .items
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
}
