//! External publisher integration
//!
//! Publishing is delegated to a command-line bot that drives a browser over
//! its remote debugging port. The debug browser is spawned once and reused
//! across publish runs; it is spawned again only after it exits.

use async_trait::async_trait;
use lista_common::config::PublisherSettings;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Characters of publisher output kept for the UI
pub const OUTPUT_TAIL_CHARS: usize = 6000;

/// Time given to a freshly spawned browser to open its debug port
const BROWSER_SETTLE: Duration = Duration::from_millis(1500);

/// Publisher errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Publisher configuration error: {0}")]
    Config(String),
}

/// Result of one publisher run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// Exit code; `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl PublishOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Publishes every pending ad
#[async_trait]
pub trait AdPublisher: Send + Sync {
    async fn publish(&self) -> Result<PublishOutcome, PublishError>;
}

/// Last `max_chars` characters of `s`
pub fn tail(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    s.chars().skip(count - max_chars).collect()
}

/// Browser arguments from the publisher's own YAML config (`browser.arguments`)
pub fn browser_arguments_from_config(config_path: &Path) -> Result<Vec<String>, PublishError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        PublishError::Config(format!("Cannot read {}: {}", config_path.display(), e))
    })?;
    let value: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| {
        PublishError::Config(format!("Cannot parse {}: {}", config_path.display(), e))
    })?;

    let arguments = value
        .get("browser")
        .and_then(|b| b.get("arguments"))
        .and_then(serde_yaml::Value::as_sequence)
        .ok_or_else(|| {
            PublishError::Config(format!(
                "{} has no browser.arguments list",
                config_path.display()
            ))
        })?;

    arguments
        .iter()
        .map(|a| {
            a.as_str().map(str::to_string).ok_or_else(|| {
                PublishError::Config("browser.arguments must be strings".to_string())
            })
        })
        .collect()
}

/// Runs the publisher binary against the pending ads
pub struct CliPublisher {
    binary: PathBuf,
    config: PathBuf,
    log_path: PathBuf,
    browser_path: PathBuf,
    browser_arguments: Vec<String>,
    browser: Mutex<Option<Child>>,
}

impl CliPublisher {
    /// Build from settings; falls back to the publisher config for browser arguments
    pub fn new(settings: &PublisherSettings, log_path: PathBuf) -> Result<Self, PublishError> {
        let browser_arguments = match &settings.browser_arguments {
            Some(arguments) => arguments.clone(),
            None => browser_arguments_from_config(&settings.config)?,
        };

        Ok(Self {
            binary: settings.binary.clone(),
            config: settings.config.clone(),
            log_path,
            browser_path: settings.browser_path.clone(),
            browser_arguments,
            browser: Mutex::new(None),
        })
    }

    /// Publish command-line arguments
    pub fn publish_args(&self) -> Vec<String> {
        vec![
            "publish".to_string(),
            "--ads=new".to_string(),
            format!("--config={}", self.config.display()),
            format!("--logfile={}", self.log_path.display()),
        ]
    }

    pub fn browser_arguments(&self) -> &[String] {
        &self.browser_arguments
    }

    /// Spawn the debug browser unless one is still running
    ///
    /// Spawn failures only warn: the publisher reports its own error if it
    /// cannot reach a browser.
    async fn ensure_browser(&self) {
        let mut browser = self.browser.lock().await;

        if let Some(child) = browser.as_mut() {
            match child.try_wait() {
                Ok(None) => return,
                Ok(Some(status)) => info!(%status, "Debug browser exited, restarting"),
                Err(e) => warn!(error = %e, "Cannot query debug browser, restarting"),
            }
        }

        match Command::new(&self.browser_path)
            .args(&self.browser_arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                info!(browser = %self.browser_path.display(), pid = ?child.id(), "Started debug browser");
                *browser = Some(child);
                tokio::time::sleep(BROWSER_SETTLE).await;
            }
            Err(e) => {
                warn!(browser = %self.browser_path.display(), error = %e, "Could not start debug browser");
                *browser = None;
            }
        }
    }
}

#[async_trait]
impl AdPublisher for CliPublisher {
    async fn publish(&self) -> Result<PublishOutcome, PublishError> {
        self.ensure_browser().await;

        info!(binary = %self.binary.display(), "Running publisher");
        let output = Command::new(&self.binary)
            .args(self.publish_args())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| PublishError::Spawn {
                program: self.binary.display().to_string(),
                source,
            })?;

        let outcome = PublishOutcome {
            exit_code: output.status.code(),
            stdout: tail(&String::from_utf8_lossy(&output.stdout), OUTPUT_TAIL_CHARS),
            stderr: tail(&String::from_utf8_lossy(&output.stderr), OUTPUT_TAIL_CHARS),
        };

        if outcome.success() {
            info!("Publisher finished successfully");
        } else {
            warn!(exit_code = ?outcome.exit_code, "Publisher failed");
        }
        Ok(outcome)
    }
}
