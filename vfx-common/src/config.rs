//! Bot configuration
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (handled alongside the CLI by the binary)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error: the bot starts on defaults. A
//! file that exists but cannot be parsed is fatal.
//!
//! The bot token is only ever read from the environment.

use crate::catalog::DEFAULT_PAGE_SIZE;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable holding the Telegram bot token
pub const TOKEN_ENV_VAR: &str = "TELEGRAM_BOT_TOKEN";

/// Directory name under the platform config dir
const APP_DIR_NAME: &str = "vfx-bot";

/// Configuration file as written on disk
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Flat directory for downloaded and generated audio
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// ffmpeg executable (name on PATH or absolute path)
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Seconds before a running transform is killed
    #[serde(default = "default_transform_timeout_secs")]
    pub transform_timeout_secs: u64,

    /// Effects per menu page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Status page port
    ///
    /// Default: 5000
    #[serde(default = "default_status_port")]
    pub status_port: u16,

    #[serde(default = "default_status_bind")]
    pub status_bind: String,

    /// Long-poll timeout for `getUpdates`
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            ffmpeg_path: default_ffmpeg_path(),
            transform_timeout_secs: default_transform_timeout_secs(),
            page_size: default_page_size(),
            status_port: default_status_port(),
            status_bind: default_status_bind(),
            poll_timeout_secs: default_poll_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("temp_audio")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_transform_timeout_secs() -> u64 {
    60
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_status_port() -> u16 {
    5000
}

fn default_status_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command-line (or environment) overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub scratch_dir: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub status_port: Option<u16>,
    pub log_level: Option<String>,
}

/// Fully resolved bot settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub scratch_dir: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub transform_timeout: Duration,
    pub page_size: usize,
    pub status_port: u16,
    pub status_bind: String,
    pub poll_timeout: Duration,
    pub log_level: String,
}

impl BotConfig {
    /// Merge overrides on top of the file configuration and validate
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        if toml.page_size == 0 {
            return Err(Error::Config("page_size must be greater than 0".to_string()));
        }
        if toml.transform_timeout_secs == 0 {
            return Err(Error::Config(
                "transform_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            scratch_dir: overrides.scratch_dir.unwrap_or(toml.scratch_dir),
            ffmpeg_path: overrides.ffmpeg_path.unwrap_or(toml.ffmpeg_path),
            transform_timeout: Duration::from_secs(toml.transform_timeout_secs),
            page_size: toml.page_size,
            status_port: overrides.status_port.unwrap_or(toml.status_port),
            status_bind: toml.status_bind,
            poll_timeout: Duration::from_secs(toml.poll_timeout_secs),
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
        })
    }

    /// `host:port` for the status server
    pub fn status_addr(&self) -> String {
        format!("{}:{}", self.status_bind, self.status_port)
    }
}

/// Platform config file location (`~/.config/vfx-bot/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Load the TOML config, falling back to defaults when the file is missing
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        // Reported by the caller, which knows whether logging is up yet
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TomlConfig::default()),
        Err(e) => {
            return Err(Error::Config(format!(
                "Failed to read config file {:?}: {}",
                path, e
            )))
        }
    };

    let config: TomlConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {:?}: {}", path, e)))?;

    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Read the bot token from [`TOKEN_ENV_VAR`]
pub fn bot_token_from_env() -> Result<String> {
    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(Error::Config(format!(
            "{} environment variable is not set",
            TOKEN_ENV_VAR
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BotConfig::resolve(TomlConfig::default(), ConfigOverrides::default()).unwrap();
        assert_eq!(config.scratch_dir, PathBuf::from("temp_audio"));
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.transform_timeout, Duration::from_secs(60));
        assert_eq!(config.page_size, 8);
        assert_eq!(config.status_port, 5000);
        assert_eq!(config.status_addr(), "0.0.0.0:5000");
        assert_eq!(config.poll_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigOverrides {
            scratch_dir: Some(PathBuf::from("/var/tmp/vfx")),
            ffmpeg_path: None,
            status_port: Some(8080),
            log_level: Some("debug".to_string()),
        };
        let config = BotConfig::resolve(TomlConfig::default(), overrides).unwrap();
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/vfx"));
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.status_port, 8080);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let toml = TomlConfig {
            page_size: 0,
            ..TomlConfig::default()
        };
        assert!(matches!(
            BotConfig::resolve(toml, ConfigOverrides::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = TomlConfig {
            transform_timeout_secs: 0,
            ..TomlConfig::default()
        };
        assert!(BotConfig::resolve(toml, ConfigOverrides::default()).is_err());
    }

    #[test]
    fn test_default_config_path_ends_with_app_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("vfx-bot/config.toml"));
        }
    }
}
