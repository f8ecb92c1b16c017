//! Configuration loading and validation tests
//!
//! Tests that manipulate LISTA_CONFIG or LISTA_GOOGLE_API_KEY are marked with
//! #[serial] so they never race each other.

use lista_common::config::{
    resolve_config_path, AppConfig, ConfigOverrides, TomlConfig, WorkPaths, API_KEY_ENV_VAR,
    CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE, DEFAULT_DESCRIPTION_SUFFIX,
};
use lista_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MINIMAL: &str = r#"
[publisher]
binary = "bin/publisher"
config = "publisher.yaml"
browser_path = "/usr/bin/chromium"

[drafting]
api_key = "toml-key"
"#;

fn parse(content: &str) -> TomlConfig {
    toml::from_str(content).unwrap()
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config = AppConfig::from_toml(
        parse(MINIMAL),
        Path::new("/srv/lista"),
        None,
        ConfigOverrides::default(),
    )
    .unwrap();

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8000);
    assert_eq!(config.work_dir, PathBuf::from("/srv/lista/.work"));
    assert_eq!(config.inbox_dir, PathBuf::from("/srv/lista/inbox"));
    assert_eq!(config.publisher.binary, PathBuf::from("/srv/lista/bin/publisher"));
    assert_eq!(config.publisher.browser_path, PathBuf::from("/usr/bin/chromium"));
    assert!(config.publisher.browser_arguments.is_none());
    assert_eq!(config.drafting.api_key, "toml-key");
    assert_eq!(config.drafting.model, "gemini-2.5-flash");
    assert_eq!(config.drafting.description_suffix, DEFAULT_DESCRIPTION_SUFFIX);
    assert_eq!(config.separator.p95_max, 20.0);
    assert!(!config.accessibility_mode);
}

#[test]
fn test_cli_overrides_win() {
    let overrides = ConfigOverrides {
        host: Some("0.0.0.0".to_string()),
        port: Some(9100),
    };
    let config = AppConfig::from_toml(parse(MINIMAL), Path::new("."), None, overrides).unwrap();
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 9100);
}

#[test]
fn test_env_api_key_wins_over_toml() {
    let config = AppConfig::from_toml(
        parse(MINIMAL),
        Path::new("."),
        Some("env-key".to_string()),
        ConfigOverrides::default(),
    )
    .unwrap();
    assert_eq!(config.drafting.api_key, "env-key");
}

#[test]
fn test_blank_env_api_key_falls_back_to_toml() {
    let config = AppConfig::from_toml(
        parse(MINIMAL),
        Path::new("."),
        Some("   ".to_string()),
        ConfigOverrides::default(),
    )
    .unwrap();
    assert_eq!(config.drafting.api_key, "toml-key");
}

#[test]
fn test_missing_required_keys_reported_together() {
    let content = r#"
port = 0

[publisher]
binary = "bin/publisher"
"#;
    let err = AppConfig::from_toml(parse(content), Path::new("."), None, ConfigOverrides::default())
        .unwrap_err();

    match err {
        Error::Config(msg) => {
            assert!(msg.contains("port"), "{}", msg);
            assert!(msg.contains("publisher.config"), "{}", msg);
            assert!(msg.contains("publisher.browser_path"), "{}", msg);
            assert!(msg.contains("drafting.api_key"), "{}", msg);
            assert!(!msg.contains("publisher.binary"), "{}", msg);
        }
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_missing_publisher_section() {
    let err = AppConfig::from_toml(
        parse("[drafting]\napi_key = \"k\"\n"),
        Path::new("."),
        None,
        ConfigOverrides::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("[publisher]"));
}

#[test]
fn test_unknown_keys_rejected() {
    let result: Result<TomlConfig, _> = toml::from_str("colour = \"blue\"\n");
    assert!(result.is_err());
}

#[test]
fn test_negative_threshold_rejected() {
    let content = format!("{}\n[separator]\nstd_max = -1.0\n", MINIMAL);
    let err = AppConfig::from_toml(parse(&content), Path::new("."), None, ConfigOverrides::default())
        .unwrap_err();
    assert!(err.to_string().contains("separator.std_max"));
}

#[test]
fn test_separator_section_partial_override() {
    let content = format!("{}\n[separator]\nresize_to = 128\n", MINIMAL);
    let config =
        AppConfig::from_toml(parse(&content), Path::new("."), None, ConfigOverrides::default())
            .unwrap();
    assert_eq!(config.separator.resize_to, 128);
    assert_eq!(config.separator.entropy_max, 1.5);
}

#[test]
#[serial]
fn test_load_from_file_reads_env_key() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("lista.toml");
    std::fs::write(&path, MINIMAL).unwrap();

    env::set_var(API_KEY_ENV_VAR, "from-env");
    let config = AppConfig::load(&path, ConfigOverrides::default());
    env::remove_var(API_KEY_ENV_VAR);

    let config = config.unwrap();
    assert_eq!(config.drafting.api_key, "from-env");
    assert_eq!(config.work_dir, temp_dir.path().join(".work"));
}

#[test]
#[serial]
fn test_load_missing_file_is_config_error() {
    env::remove_var(API_KEY_ENV_VAR);
    let err = AppConfig::load(Path::new("/nonexistent/lista.toml"), ConfigOverrides::default())
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_resolve_config_path_priority() {
    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(resolve_config_path(None), PathBuf::from(DEFAULT_CONFIG_FILE));

    env::set_var(CONFIG_ENV_VAR, "/etc/lista/env.toml");
    assert_eq!(resolve_config_path(None), PathBuf::from("/etc/lista/env.toml"));
    assert_eq!(
        resolve_config_path(Some(Path::new("cli.toml"))),
        PathBuf::from("cli.toml")
    );
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_work_paths_ensure_exists() {
    let temp_dir = TempDir::new().unwrap();
    let paths = WorkPaths::new(&temp_dir.path().join(".work"), &temp_dir.path().join("inbox"));
    paths.ensure_exists().unwrap();

    assert!(paths.input_dir.is_dir());
    assert!(paths.ads_dir.is_dir());
    assert!(paths.ads_archive_dir.is_dir());
    assert!(paths.input_archive_dir.is_dir());
    assert!(paths.audio_dir.is_dir());
    assert!(paths.inbox_dir.is_dir());

    // Second call is a no-op
    paths.ensure_exists().unwrap();
}
