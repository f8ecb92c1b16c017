//! lista-app: classified-ad listing assistant
//!
//! Segments the photo inbox into item folders, then serves the web UI used
//! to crop photos, draft listings from voice memos and publish them.

use anyhow::{Context, Result};
use clap::Parser;
use lista_app::services::{CliPublisher, FfmpegSilenceStripper, GeminiDrafter, SeparatorDetector};
use lista_app::{build_router, AppState, Collaborators};
use lista_common::config::{resolve_config_path, AppConfig, ConfigOverrides, LoggingConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lista-app")]
#[command(about = "Turns photographed items into classified ads", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file (default: lista.toml)
    #[arg(short, long, env = "LISTA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Start without segmenting the inbox
    #[arg(long)]
    skip_inbox: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = AppConfig::load(
        &config_path,
        ConfigOverrides {
            host: args.host.clone(),
            port: args.port,
        },
    )
    .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    init_tracing(&config.logging)?;

    info!(
        "Starting lista-app v{} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    info!("Configuration: {}", config_path.display());

    let paths = config.work_paths();
    paths
        .ensure_exists()
        .context("Failed to prepare working directory")?;
    info!("Working directory: {}", paths.work_dir.display());

    let collaborators = Collaborators {
        classifier: Arc::new(SeparatorDetector::with_config(config.separator)),
        drafter: Arc::new(
            GeminiDrafter::new(&config.drafting).context("Failed to initialize drafting client")?,
        ),
        audio: Arc::new(FfmpegSilenceStripper::new()),
        publisher: Arc::new(
            CliPublisher::new(&config.publisher, paths.publisher_log.clone())
                .context("Failed to initialize publisher")?,
        ),
    };
    let state = AppState::from_config(&config, collaborators);

    if args.skip_inbox {
        info!("Skipping inbox processing");
    } else {
        let segmenter = state.segmenter();
        let report = tokio::task::spawn_blocking(move || segmenter.segment())
            .await
            .context("Inbox processing task failed")?
            .context("Inbox processing failed")?;
        info!(
            "Inbox processed: {} items, {} images, {} separators",
            report.items_created.len(),
            report.images_moved,
            report.separators_removed
        );
    }

    let item_count = state
        .items
        .refresh()
        .await
        .context("Failed to scan input folder")?
        .len();
    info!("{} items ready", item_count);

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. With `[logging].file` set,
/// output is appended to that file instead of stderr.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &logging.level;
        EnvFilter::new(format!(
            "lista_app={level},lista_common={level},tower_http={level}"
        ))
    });

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if std::env::var_os("RUST_LOG").is_some() {
        debug!("RUST_LOG set, configured log level ignored");
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
