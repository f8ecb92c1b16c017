//! Voice memo preprocessing
//!
//! Pauses are cut out before drafting so the upload stays small.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Silence removal filter: drop every pause longer than 0.5 s below -50 dB
pub const SILENCE_FILTER: &str = "silenceremove=stop_periods=-1:stop_duration=0.5:stop_threshold=-50dB";

/// Audio preprocessing errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rewrites a recording without its silent stretches
#[async_trait]
pub trait AudioPreprocessor: Send + Sync {
    async fn strip_silence(&self, src: &Path, dst: &Path) -> Result<(), AudioError>;
}

/// ffmpeg-based silence stripper (Opus, 64 kbit/s, 48 kHz)
#[derive(Debug, Clone)]
pub struct FfmpegSilenceStripper {
    program: PathBuf,
}

impl FfmpegSilenceStripper {
    /// Use `ffmpeg` from `PATH`
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for one conversion
    pub fn args(src: &Path, dst: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            src.display().to_string(),
            "-af".to_string(),
            SILENCE_FILTER.to_string(),
            "-acodec".to_string(),
            "libopus".to_string(),
            "-b:a".to_string(),
            "64k".to_string(),
            "-ar".to_string(),
            "48000".to_string(),
            dst.display().to_string(),
        ]
    }
}

impl Default for FfmpegSilenceStripper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioPreprocessor for FfmpegSilenceStripper {
    async fn strip_silence(&self, src: &Path, dst: &Path) -> Result<(), AudioError> {
        let output = Command::new(&self.program)
            .args(Self::args(src, dst))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| AudioError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(AudioError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!(src = %src.display(), dst = %dst.display(), "Stripped silence");
        Ok(())
    }
}
