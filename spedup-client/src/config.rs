//! Runtime configuration for the spedup client
//!
//! Server URL, bearer token and company id are resolved CLI → ENV → TOML;
//! the server URL falls back to a compiled default, the token has none.

use spedup_common::config::{
    resolve_setting, PipelineConfig, SettingSource, TomlConfig, DEFAULT_SERVER_URL, ENV_COMPANY_ID,
    ENV_SERVER_URL, ENV_TOKEN,
};
use spedup_common::{Error, Result};
use tracing::info;

/// Values given on the command line, all optional
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub company_id: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub token: String,
    pub company_id: Option<String>,
    pub log_level: String,
    pub pipeline: PipelineConfig,
}

impl ClientConfig {
    /// Resolve every setting; fails only when no token is configured
    pub fn resolve(toml: &TomlConfig, cli: &CliOverrides) -> Result<Self> {
        let (server_url, url_source) = resolve_setting(
            "server_url",
            cli.server_url.as_deref(),
            ENV_SERVER_URL,
            toml.server_url.as_deref(),
        )
        .unwrap_or_else(|| (DEFAULT_SERVER_URL.to_string(), SettingSource::Default));

        let (token, _) = resolve_setting("token", cli.token.as_deref(), ENV_TOKEN, toml.token.as_deref())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Bearer token not configured. Please configure using one of:\n\
                     - Command line: --token <TOKEN>\n\
                     - Environment: {}=<TOKEN>\n\
                     - TOML config: token = \"<TOKEN>\"",
                    ENV_TOKEN
                ))
            })?;

        let company_id = resolve_setting(
            "company_id",
            cli.company_id.as_deref(),
            ENV_COMPANY_ID,
            toml.company_id.as_deref(),
        )
        .map(|(value, _)| value);

        let log_level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| toml.logging.level.clone());

        info!("Server URL: {} (from {})", server_url, url_source);

        Ok(Self {
            server_url,
            token,
            company_id,
            log_level,
            pipeline: toml.pipeline.clone(),
        })
    }
}
