//! Configuration loading and working-tree layout
//!
//! Bootstrap configuration is a single TOML file. Values resolve with the
//! priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Built-in defaults (lowest priority)
//!
//! [`TomlConfig`] mirrors the file as written; [`AppConfig`] is the validated
//! form handed to the application. Validation fails fast and reports every
//! problem found instead of stopping at the first one.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "LISTA_CONFIG";

/// Environment variable carrying the drafting API key (wins over TOML)
pub const API_KEY_ENV_VAR: &str = "LISTA_GOOGLE_API_KEY";

/// Config file used when neither CLI nor environment name one
pub const DEFAULT_CONFIG_FILE: &str = "lista.toml";

/// Appended to every drafted description unless the config overrides it
pub const DEFAULT_DESCRIPTION_SUFFIX: &str = "\
Versand kann gegen Aufpreis erfolgen.

Schau auch gerne bei meinen anderen Anzeigen rein, vielleicht kannst du ja Versand sparen :)



--- Standard Disclaimer:

Privatverkauf. Die Ware wird unter Ausschluss jeglicher Gewährleistung verkauft. \
Ich schließe jegliche Sachmangelhaftung aus. Die Haftung aufgrund von Arglist und Vorsatz \
sowie für Schadensersatz wegen Verletzungen von Körper, Leben oder Gesundheit sowie bei \
grober Fahrlässigkeit oder Vorsatz bleibt unberührt.
";

/// Configuration file as written on disk
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// HTTP bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Working tree holding input, ads, archives and audio
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Drop folder for freshly photographed images
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: PathBuf,

    /// Forwarded to the UI
    #[serde(default)]
    pub accessibility_mode: bool,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External publisher settings (required section)
    #[serde(default)]
    pub publisher: Option<PublisherToml>,

    /// Speech drafting settings
    #[serde(default)]
    pub drafting: DraftingToml,

    /// Separator frame thresholds
    #[serde(default)]
    pub separator: SeparatorConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// `[publisher]` section as written
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherToml {
    pub binary: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub browser_path: Option<PathBuf>,
    /// When absent, read from the publisher config's `browser.arguments`
    pub browser_arguments: Option<Vec<String>>,
}

/// `[drafting]` section as written
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DraftingToml {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_categories_file")]
    pub categories_file: PathBuf,
    #[serde(default)]
    pub description_suffix: Option<String>,
}

impl Default for DraftingToml {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            categories_file: default_categories_file(),
            description_suffix: None,
        }
    }
}

/// Heuristic thresholds for separator frame detection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SeparatorConfig {
    /// Side length of the square the image is resized to before analysis
    pub resize_to: u32,
    /// Upper bound for the 95th percentile brightness
    pub p95_max: f64,
    /// Upper bound for the intensity standard deviation
    pub std_max: f64,
    /// Upper bound for histogram entropy in bits
    pub entropy_max: f64,
    /// Upper bound for the fraction of edge pixels
    pub edge_ratio_max: f64,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            resize_to: 256,
            p95_max: 20.0,
            std_max: 8.0,
            entropy_max: 1.5,
            edge_ratio_max: 0.001,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".work")
}

fn default_inbox_dir() -> PathBuf {
    PathBuf::from("inbox")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_categories_file() -> PathBuf {
    PathBuf::from("categories.txt")
}

/// Validated publisher settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherSettings {
    pub binary: PathBuf,
    pub config: PathBuf,
    pub browser_path: PathBuf,
    pub browser_arguments: Option<Vec<String>>,
}

/// Validated drafting settings
#[derive(Clone)]
pub struct DraftingSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub categories_file: PathBuf,
    pub description_suffix: String,
}

impl std::fmt::Debug for DraftingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftingSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("categories_file", &self.categories_file)
            .finish()
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Complete, validated application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub work_dir: PathBuf,
    pub inbox_dir: PathBuf,
    pub accessibility_mode: bool,
    pub logging: LoggingConfig,
    pub publisher: PublisherSettings,
    pub drafting: DraftingSettings,
    pub separator: SeparatorConfig,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    ///
    /// Relative paths inside the file resolve against the file's directory.
    /// The drafting API key from [`API_KEY_ENV_VAR`] takes priority over the
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed, or if
    /// validation finds any problem.
    pub fn load(toml_path: &Path, overrides: ConfigOverrides) -> Result<Self> {
        let content = std::fs::read_to_string(toml_path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                toml_path.display(),
                e
            ))
        })?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        info!("Loaded TOML configuration from {}", toml_path.display());

        let base_dir = toml_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let env_key = std::env::var(API_KEY_ENV_VAR).ok();
        Self::from_toml(toml_config, base_dir, env_key, overrides)
    }

    /// Validate a parsed config and resolve its paths against `base_dir`
    pub fn from_toml(
        toml_config: TomlConfig,
        base_dir: &Path,
        env_api_key: Option<String>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let mut problems = Vec::new();

        let host = overrides.host.unwrap_or(toml_config.host);
        let port = overrides.port.unwrap_or(toml_config.port);

        if host.trim().is_empty() {
            problems.push("host must not be empty".to_string());
        }
        if port == 0 {
            problems.push("port must be non-zero".to_string());
        }

        let publisher = match toml_config.publisher {
            Some(section) => {
                let binary = require_path(section.binary, "publisher.binary", &mut problems);
                let config = require_path(section.config, "publisher.config", &mut problems);
                let browser_path =
                    require_path(section.browser_path, "publisher.browser_path", &mut problems);
                Some((binary, config, browser_path, section.browser_arguments))
            }
            None => {
                problems.push("missing [publisher] section".to_string());
                None
            }
        };

        let drafting = toml_config.drafting;
        let api_key = match (env_api_key, drafting.api_key) {
            (Some(env_key), toml_key) if is_valid_key(&env_key) => {
                if toml_key.as_deref().is_some_and(is_valid_key) {
                    warn!(
                        "Drafting API key found in environment and TOML. Using {}.",
                        API_KEY_ENV_VAR
                    );
                }
                Some(env_key)
            }
            (_, Some(toml_key)) if is_valid_key(&toml_key) => Some(toml_key),
            _ => {
                problems.push(format!(
                    "drafting.api_key not configured (set it in TOML or {})",
                    API_KEY_ENV_VAR
                ));
                None
            }
        };

        if !(0.0..=2.0).contains(&drafting.temperature) {
            problems.push(format!(
                "drafting.temperature must be within 0.0..=2.0, got {}",
                drafting.temperature
            ));
        }
        if drafting.model.trim().is_empty() {
            problems.push("drafting.model must not be empty".to_string());
        }

        let separator = toml_config.separator;
        if separator.resize_to == 0 {
            problems.push("separator.resize_to must be positive".to_string());
        }
        for (name, value) in [
            ("separator.p95_max", separator.p95_max),
            ("separator.std_max", separator.std_max),
            ("separator.entropy_max", separator.entropy_max),
            ("separator.edge_ratio_max", separator.edge_ratio_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                problems.push(format!("{} must be a non-negative number", name));
            }
        }

        let (publisher, api_key) = match (publisher, api_key) {
            (Some((Some(binary), Some(config), Some(browser_path), args)), Some(key))
                if problems.is_empty() =>
            {
                (
                    PublisherSettings {
                        binary: resolve_path(base_dir, &binary),
                        config: resolve_path(base_dir, &config),
                        browser_path: resolve_path(base_dir, &browser_path),
                        browser_arguments: args,
                    },
                    key,
                )
            }
            _ => {
                return Err(Error::Config(problems.join("; ")));
            }
        };

        let logging = LoggingConfig {
            level: toml_config.logging.level,
            file: toml_config
                .logging
                .file
                .map(|f| resolve_path(base_dir, &f)),
        };

        Ok(Self {
            host,
            port,
            work_dir: resolve_path(base_dir, &toml_config.work_dir),
            inbox_dir: resolve_path(base_dir, &toml_config.inbox_dir),
            accessibility_mode: toml_config.accessibility_mode,
            logging,
            publisher,
            drafting: DraftingSettings {
                api_key,
                model: drafting.model,
                temperature: drafting.temperature,
                categories_file: resolve_path(base_dir, &drafting.categories_file),
                description_suffix: drafting
                    .description_suffix
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION_SUFFIX.to_string()),
            },
            separator,
        })
    }

    /// Working-tree layout derived from this configuration
    pub fn work_paths(&self) -> WorkPaths {
        WorkPaths::new(&self.work_dir, &self.inbox_dir)
    }
}

/// Resolve the config file path: CLI argument → environment → default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn require_path(
    value: Option<PathBuf>,
    key: &str,
    problems: &mut Vec<String>,
) -> Option<PathBuf> {
    match value {
        Some(p) if !p.as_os_str().is_empty() => Some(p),
        _ => {
            problems.push(format!("missing required key {}", key));
            None
        }
    }
}

/// Expand a leading `~` and anchor relative paths at `base_dir`
pub fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))
        {
            return PathBuf::from(home).join(rest);
        }
    }

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Directory layout of the working tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPaths {
    pub work_dir: PathBuf,
    pub inbox_dir: PathBuf,
    /// Item folders produced by segmentation
    pub input_dir: PathBuf,
    /// Pending ad folders awaiting publish
    pub ads_dir: PathBuf,
    /// Ad folders promoted after a successful publish
    pub ads_archive_dir: PathBuf,
    /// Item folders consumed by submit or discard
    pub input_archive_dir: PathBuf,
    /// Transient audio uploads
    pub audio_dir: PathBuf,
    /// Log file handed to the publisher binary
    pub publisher_log: PathBuf,
}

impl WorkPaths {
    pub fn new(work_dir: &Path, inbox_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            inbox_dir: inbox_dir.to_path_buf(),
            input_dir: work_dir.join("input"),
            ads_dir: work_dir.join("ads"),
            ads_archive_dir: work_dir.join("ads_archive"),
            input_archive_dir: work_dir.join("input_archive"),
            audio_dir: work_dir.join("audio"),
            publisher_log: work_dir.join("publisher.log"),
        }
    }

    /// Create every directory of the layout if missing
    pub fn ensure_exists(&self) -> Result<()> {
        for dir in [
            &self.work_dir,
            &self.inbox_dir,
            &self.input_dir,
            &self.ads_dir,
            &self.ads_archive_dir,
            &self.input_archive_dir,
            &self.audio_dir,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::Config(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        info!(work_dir = %self.work_dir.display(), "Working tree ready");
        Ok(())
    }
}
