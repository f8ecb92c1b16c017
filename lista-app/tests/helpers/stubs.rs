//! Stub collaborators for tests

use async_trait::async_trait;
use lista_app::models::Draft;
use lista_app::services::{
    AdPublisher, AudioError, AudioPreprocessor, DetectError, DraftError, ListingDrafter,
    PublishError, PublishOutcome, SeparatorClassifier,
};
use std::path::Path;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

/// Separator iff the file name contains "sep"
pub struct NameClassifier;

impl SeparatorClassifier for NameClassifier {
    fn is_separator(&self, path: &Path) -> Result<bool, DetectError> {
        Ok(path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().contains("sep")))
    }
}

/// Returns a fixed draft mentioning the received byte count
pub struct StubDrafter;

#[async_trait]
impl ListingDrafter for StubDrafter {
    async fn draft(&self, audio: Vec<u8>, _mime_type: &str) -> Result<Draft, DraftError> {
        Ok(Draft {
            ad_type: "OFFER".to_string(),
            price_type: "FIXED".to_string(),
            title: "Holzstuhl Eiche".to_string(),
            description: format!("{} bytes", audio.len()),
            category: "80/83".to_string(),
            price: 25,
            shipping_type: "PICKUP".to_string(),
            sell_directly: false,
        })
    }
}

/// "Strips silence" by copying the file unchanged
pub struct CopyAudio;

#[async_trait]
impl AudioPreprocessor for CopyAudio {
    async fn strip_silence(&self, src: &Path, dst: &Path) -> Result<(), AudioError> {
        tokio::fs::copy(src, dst).await?;
        Ok(())
    }
}

/// Publisher with a settable exit code that counts its runs
pub struct StubPublisher {
    exit_code: AtomicI32,
    runs: AtomicUsize,
}

impl StubPublisher {
    pub fn new(exit_code: i32) -> Self {
        Self {
            exit_code: AtomicI32::new(exit_code),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn set_exit_code(&self, exit_code: i32) {
        self.exit_code.store(exit_code, Ordering::SeqCst);
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdPublisher for StubPublisher {
    async fn publish(&self) -> Result<PublishOutcome, PublishError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(PublishOutcome {
            exit_code: Some(self.exit_code.load(Ordering::SeqCst)),
            stdout: "published".to_string(),
            stderr: String::new(),
        })
    }
}
