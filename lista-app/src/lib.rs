//! lista-app library interface
//!
//! Exposes the application state, router and services for the binary and
//! for integration testing.

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use lista_common::config::{AppConfig, WorkPaths};
use services::{
    AdPublisher, AdStore, AudioPreprocessor, InboxSegmenter, InputArchive, ItemRepository,
    ListingDrafter, SeparatorClassifier,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Working-tree layout
    pub paths: Arc<WorkPaths>,
    /// Accessibility flag passed to the UI
    pub accessibility_mode: bool,
    /// Item folder snapshot
    pub items: Arc<ItemRepository>,
    /// Input archive ledger
    pub archive: Arc<InputArchive>,
    /// Pending and archived ad folders
    pub ads: Arc<AdStore>,
    /// Separator classifier used by inbox processing
    pub classifier: Arc<dyn SeparatorClassifier>,
    /// Voice memo to listing draft
    pub drafter: Arc<dyn ListingDrafter>,
    /// Silence stripping before drafting
    pub audio: Arc<dyn AudioPreprocessor>,
    /// External publisher
    pub publisher: Arc<dyn AdPublisher>,
    /// Serializes filesystem-mutating workflows (segment, submit, archive, restore, promote)
    pub fs_lock: Arc<tokio::sync::Mutex<()>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes; cleared by the next successful
    /// publish or inbox run
    pub last_error: Arc<RwLock<Option<String>>>,
}

/// External collaborators injected into [`AppState`]
pub struct Collaborators {
    pub classifier: Arc<dyn SeparatorClassifier>,
    pub drafter: Arc<dyn ListingDrafter>,
    pub audio: Arc<dyn AudioPreprocessor>,
    pub publisher: Arc<dyn AdPublisher>,
}

impl AppState {
    pub fn new(paths: WorkPaths, accessibility_mode: bool, collaborators: Collaborators) -> Self {
        Self {
            items: Arc::new(ItemRepository::new(paths.input_dir.clone())),
            archive: Arc::new(InputArchive::new(
                paths.input_dir.clone(),
                paths.input_archive_dir.clone(),
            )),
            ads: Arc::new(AdStore::new(paths.ads_dir.clone(), paths.ads_archive_dir.clone())),
            paths: Arc::new(paths),
            accessibility_mode,
            classifier: collaborators.classifier,
            drafter: collaborators.drafter,
            audio: collaborators.audio,
            publisher: collaborators.publisher,
            fs_lock: Arc::new(tokio::sync::Mutex::new(())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// State for a loaded configuration
    pub fn from_config(config: &AppConfig, collaborators: Collaborators) -> Self {
        Self::new(config.work_paths(), config.accessibility_mode, collaborators)
    }

    /// Segmenter over this state's inbox and input root
    pub fn segmenter(&self) -> InboxSegmenter {
        InboxSegmenter::new(
            self.paths.inbox_dir.clone(),
            self.paths.input_dir.clone(),
            Arc::clone(&self.classifier),
        )
    }

    /// Remember an error for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }

    /// Forget the last error after a workflow completed successfully
    pub async fn clear_error(&self) {
        *self.last_error.write().await = None;
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let media = ServeDir::new(&state.paths.input_dir);

    Router::new()
        // UI routes (HTML pages)
        .merge(api::ui_routes())
        // API routes
        .merge(api::item_routes())
        .merge(api::audio_routes())
        .merge(api::pending_routes())
        .merge(api::archive_routes())
        .merge(api::inbox_routes())
        .merge(api::config_routes())
        .merge(api::health_routes())
        .nest_service("/media", media)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
