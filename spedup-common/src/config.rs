//! Configuration loading and setting resolution
//!
//! spedup reads an optional TOML file for bootstrap settings. Individual
//! settings (server URL, bearer token, company id) are resolved with the
//! following priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback, where one exists)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default API server when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Environment variable overriding the server URL
pub const ENV_SERVER_URL: &str = "SPEDUP_SERVER_URL";
/// Environment variable carrying the bearer token
pub const ENV_TOKEN: &str = "SPEDUP_TOKEN";
/// Environment variable selecting the target company
pub const ENV_COMPANY_ID: &str = "SPEDUP_COMPANY_ID";

/// Record tags kept by default: file header, participants, items, the
/// document and totals blocks used by the consolidation views, and the
/// file trailer.
pub const DEFAULT_ALLOWED_RECORDS: &[&str] = &[
    "0000", "0140", "0150", "0190", "0200", "A100", "A170", "C100", "C170", "C181", "C185",
    "C190", "C500", "C501", "C505", "D100", "D101", "D105", "F100", "M100", "M200", "M500",
    "M600", "9999",
];

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the ingestion API
    #[serde(default)]
    pub server_url: Option<String>,

    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,

    /// Company the uploaded ledgers belong to
    #[serde(default)]
    pub company_id: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pipeline tuning (optional)
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Sizes and intervals used by the ingestion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bytes read from the source file per scan window
    pub scan_window_bytes: usize,
    /// Bytes sent per upload request
    pub upload_chunk_bytes: usize,
    /// Prefix of the raw file inspected for the header record
    pub header_probe_bytes: usize,
    /// Interval between job-status polls
    pub poll_interval_ms: u64,
    /// Give up waiting after this many polls (unbounded when absent)
    pub max_poll_ticks: Option<u32>,
    /// Record-type tags forwarded to the server
    pub allowed_records: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scan_window_bytes: 5 * 1024 * 1024,
            upload_chunk_bytes: 2 * 1024 * 1024,
            header_probe_bytes: 4 * 1024,
            poll_interval_ms: 2000,
            max_poll_ticks: None,
            allowed_records: DEFAULT_ALLOWED_RECORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.scan_window_bytes == 0 {
            return Err(Error::Config("scan_window_bytes must be greater than zero".to_string()));
        }
        if self.upload_chunk_bytes == 0 {
            return Err(Error::Config("upload_chunk_bytes must be greater than zero".to_string()));
        }
        if self.header_probe_bytes == 0 {
            return Err(Error::Config("header_probe_bytes must be greater than zero".to_string()));
        }
        if self.allowed_records.is_empty() {
            return Err(Error::Config("allowed_records must not be empty".to_string()));
        }
        if let Some(tag) = self.allowed_records.iter().find(|t| t.is_empty() || t.contains('|')) {
            return Err(Error::Config(format!("invalid record tag in allowed_records: {:?}", tag)));
        }
        Ok(())
    }

    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    TomlFile,
    Default,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SettingSource::CommandLine => "command line",
            SettingSource::Environment => "environment",
            SettingSource::TomlFile => "TOML",
            SettingSource::Default => "default",
        };
        f.write_str(name)
    }
}

/// Resolve a single setting from CLI → ENV → TOML
///
/// Blank values are treated as absent. Warns when more than one source
/// provides a value, since only the highest priority one is used.
pub fn resolve_setting(
    name: &str,
    cli_value: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<(String, SettingSource)> {
    let env_value = std::env::var(env_var_name).ok();

    let candidates = [
        (cli_value, SettingSource::CommandLine),
        (env_value.as_deref(), SettingSource::Environment),
        (toml_value, SettingSource::TomlFile),
    ];

    let present: Vec<(&str, SettingSource)> = candidates
        .iter()
        .filter_map(|(value, source)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (v, *source))
        })
        .collect();

    if present.len() > 1 {
        let sources: Vec<String> = present.iter().map(|(_, s)| s.to_string()).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            present[0].1
        );
    }

    present.first().map(|(value, source)| {
        debug!("{} loaded from {}", name, source);
        (value.to_string(), *source)
    })
}

/// Default configuration file path for the platform
///
/// `~/.config/spedup/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spedup").join("config.toml"))
}

/// Load TOML configuration
///
/// An explicitly requested file must exist and parse. When no path is given
/// the platform default is tried; if it does not exist the compiled defaults
/// are used and startup continues.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let config = match explicit_path {
        Some(path) => read_toml_config(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_toml_config(&path)?,
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                TomlConfig::default()
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                TomlConfig::default()
            }
        },
    };

    config.pipeline.validate()?;
    Ok(config)
}

fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        warn!("Failed to read {}: {}", path.display(), e);
        e
    })?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}
