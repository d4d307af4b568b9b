//! Configuration management.

use crate::release::DEFAULT_TTL;
use crate::version::default_user_agent;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tags listing queried for the latest release.
pub const DEFAULT_TAGS_URL: &str = "https://api.github.com/repos/tvhub/tvhub/tags";

/// Timeout of one release lookup.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
struct ConfigFile {
    #[serde(default)]
    #[garde(skip)]
    server: ServerConfig,
    #[serde(default)]
    #[garde(dive)]
    general: GeneralConfig,
    #[serde(default)]
    #[garde(dive)]
    update_check: UpdateCheckConfig,
    #[serde(default)]
    #[garde(skip)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_port")]
    port: u16,
    /// Allowed CORS origins, any origin when empty
    #[serde(default)]
    cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct GeneralConfig {
    #[garde(length(min = 1))]
    backend: String,
    #[garde(length(min = 1))]
    encoder: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            backend: "EDCB".to_string(),
            encoder: "FFmpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct UpdateCheckConfig {
    #[garde(url)]
    tags_url: String,
    #[garde(range(min = 1, max = 60))]
    timeout_secs: u64,
    #[garde(range(min = 1))]
    ttl_secs: u64,
    /// Overrides the default `tvhub/<version>` user agent
    #[garde(skip)]
    user_agent: Option<String>,
}

impl Default for UpdateCheckConfig {
    fn default() -> Self {
        Self {
            tags_url: DEFAULT_TAGS_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            ttl_secs: DEFAULT_TTL.as_secs(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LoggingConfig {
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    log_level: Option<String>,
}

fn default_port() -> u16 {
    tvhub_types::DEFAULT_PORT
}

/// Values reported by the version endpoint as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    /// Recording backend in use
    pub backend: String,
    /// Encoder in use
    pub encoder: String,
}

/// Settings of the latest release lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheckSettings {
    pub tags_url: String,
    pub timeout: Duration,
    pub ttl: Duration,
    pub user_agent: String,
}

/// Command line values that take precedence over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub backend: Option<String>,
    pub encoder: Option<String>,
    pub tags_url: Option<String>,
    pub log_level: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins (any origin if empty)
    pub cors_allowed_origins: Vec<String>,
    pub general: GeneralSettings,
    pub update_check: UpdateCheckSettings,
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    pub log_file: Option<PathBuf>,
    /// Log level (if set, overrides RUST_LOG environment variable)
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with full priority chain: CLI args > env vars > config files > defaults.
    ///
    /// Config files are searched in this order:
    /// 1. `config.toml` in user config directory (~/.config/tvhub/ on Linux)
    /// 2. `.tvhub.toml` in current directory
    ///
    /// Environment variables use the `TVHUB_` prefix and `__` between
    /// section and key, e.g. `TVHUB_GENERAL__BACKEND`.
    pub fn from_figment(overrides: ConfigOverrides) -> anyhow::Result<Self> {
        let local_config = std::env::current_dir().ok().map(|d| d.join(".tvhub.toml"));
        let user_config = directories::ProjectDirs::from("", "", "tvhub")
            .map(|dirs| dirs.config_dir().join("config.toml"));

        // defaults < user config < local config < env vars < CLI args
        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        for path in [user_config, local_config].into_iter().flatten() {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("TVHUB_").split("__"));

        if let Some(p) = overrides.port {
            figment = figment.merge(Serialized::default("server.port", p));
        }
        if let Some(ref backend) = overrides.backend {
            figment = figment.merge(Serialized::default("general.backend", backend));
        }
        if let Some(ref encoder) = overrides.encoder {
            figment = figment.merge(Serialized::default("general.encoder", encoder));
        }
        if let Some(ref url) = overrides.tags_url {
            figment = figment.merge(Serialized::default("update_check.tags_url", url));
        }
        if let Some(ref level) = overrides.log_level {
            figment = figment.merge(Serialized::default("logging.log_level", level));
        }

        Self::from_config_file(figment.extract()?)
    }

    /// Load configuration from a single TOML file on top of the defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(ConfigFile::default()))
            .merge(Toml::file(path.as_ref()));

        Self::from_config_file(figment.extract()?)
    }

    fn from_config_file(config_file: ConfigFile) -> anyhow::Result<Self> {
        config_file
            .validate()
            .map_err(|report| anyhow::anyhow!("Invalid configuration: {}", report))?;

        Ok(config_file.into())
    }
}

impl From<ConfigFile> for Config {
    fn from(config_file: ConfigFile) -> Self {
        let update_check = config_file.update_check;
        Self {
            port: config_file.server.port,
            cors_allowed_origins: config_file.server.cors_allowed_origins,
            general: GeneralSettings {
                backend: config_file.general.backend,
                encoder: config_file.general.encoder,
            },
            update_check: UpdateCheckSettings {
                tags_url: update_check.tags_url,
                timeout: Duration::from_secs(update_check.timeout_secs),
                ttl: Duration::from_secs(update_check.ttl_secs),
                user_agent: update_check
                    .user_agent
                    .unwrap_or_else(default_user_agent),
            },
            log_file: config_file.logging.log_file,
            log_level: config_file.logging.log_level,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigFile::default().into()
    }
}
