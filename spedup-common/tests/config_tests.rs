//! Configuration loading and setting resolution tests
//!
//! Tests that manipulate SPEDUP_* environment variables are marked with
//! #[serial] so they never run in parallel with each other.

use serial_test::serial;
use spedup_common::config::{
    load_toml_config, resolve_setting, PipelineConfig, SettingSource, ENV_SERVER_URL, ENV_TOKEN,
};
use spedup_common::Error;
use std::env;
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_value_wins_over_env_and_toml() {
    env::set_var(ENV_SERVER_URL, "http://env.example");

    let resolved = resolve_setting(
        "server_url",
        Some("http://cli.example"),
        ENV_SERVER_URL,
        Some("http://toml.example"),
    );

    env::remove_var(ENV_SERVER_URL);
    assert_eq!(
        resolved,
        Some(("http://cli.example".to_string(), SettingSource::CommandLine))
    );
}

#[test]
#[serial]
fn test_env_wins_over_toml() {
    env::set_var(ENV_TOKEN, "env-token");

    let resolved = resolve_setting("token", None, ENV_TOKEN, Some("toml-token"));

    env::remove_var(ENV_TOKEN);
    assert_eq!(
        resolved,
        Some(("env-token".to_string(), SettingSource::Environment))
    );
}

#[test]
#[serial]
fn test_blank_values_fall_through_to_toml() {
    env::set_var(ENV_TOKEN, "   ");

    let resolved = resolve_setting("token", Some(""), ENV_TOKEN, Some("toml-token"));

    env::remove_var(ENV_TOKEN);
    assert_eq!(
        resolved,
        Some(("toml-token".to_string(), SettingSource::TomlFile))
    );
}

#[test]
#[serial]
fn test_nothing_configured_resolves_to_none() {
    env::remove_var(ENV_TOKEN);
    assert_eq!(resolve_setting("token", None, ENV_TOKEN, None), None);
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");

    let err = load_toml_config(Some(&missing)).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_load_full_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
server_url = "https://fiscal.example.com"
token = "secret"
company_id = "17"

[logging]
level = "debug"

[pipeline]
upload_chunk_bytes = 524288
max_poll_ticks = 300
"#,
    )
    .unwrap();

    let loaded = load_toml_config(Some(&path)).unwrap();

    assert_eq!(loaded.server_url.as_deref(), Some("https://fiscal.example.com"));
    assert_eq!(loaded.token.as_deref(), Some("secret"));
    assert_eq!(loaded.company_id.as_deref(), Some("17"));
    assert_eq!(loaded.logging.level, "debug");
    assert_eq!(
        loaded.pipeline,
        PipelineConfig {
            upload_chunk_bytes: 512 * 1024,
            max_poll_ticks: Some(300),
            ..Default::default()
        }
    );
}

#[test]
fn test_invalid_pipeline_in_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[pipeline]\nupload_chunk_bytes = 0\n").unwrap();

    let err = load_toml_config(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("upload_chunk_bytes"));
}

#[test]
fn test_malformed_toml_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "server_url = [unterminated").unwrap();

    assert!(load_toml_config(Some(&path)).is_err());
}
