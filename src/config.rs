//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::pipeline::{QueryPipeline, DEFAULT_ROW_LIMIT};
use crate::resample::FillMode;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query pipeline defaults
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Row cap when a request sets none; negative for unlimited
    #[serde(default = "default_row_limit")]
    pub row_limit: i64,

    /// Resample interval when a request sets none (0 disables)
    #[serde(default)]
    pub default_interval_ms: i64,

    /// Fill mode for time-series requests: "previous", "null" or "value:N"
    pub fill_mode: Option<String>,
}

fn default_row_limit() -> i64 {
    DEFAULT_ROW_LIMIT
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            row_limit: default_row_limit(),
            default_interval_ms: 0,
            fill_mode: None,
        }
    }
}

impl QueryConfig {
    /// Configured fill mode, if set and valid
    pub fn fill(&self) -> Option<FillMode> {
        let raw = self.fill_mode.as_deref()?;
        let fill = FillMode::parse(raw);
        if fill.is_none() {
            tracing::warn!("Ignoring invalid fill_mode {:?}", raw);
        }
        fill
    }

    /// Pipeline configured with these defaults
    pub fn pipeline(&self) -> QueryPipeline {
        QueryPipeline::new()
            .row_limit(self.row_limit)
            .default_interval(Duration::milliseconds(self.default_interval_ms.max(0)))
    }
}

/// SQLite database configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Database file used when the CLI gets no `--db`
    pub path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::search_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Config file locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("sqlframe").join("config.toml")),
            Some(PathBuf::from("/etc/sqlframe/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("SQLFRAME_DATABASE") {
            self.database.path = Some(path);
        }
        if let Some(limit) = var("SQLFRAME_ROW_LIMIT") {
            if let Ok(limit) = limit.parse() {
                self.query.row_limit = limit;
            }
        }

        // Logging overrides
        if let Some(level) = var("SQLFRAME_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("SQLFRAME_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# sqlframe Configuration
#
# Environment variables override these settings:
# - SQLFRAME_DATABASE
# - SQLFRAME_ROW_LIMIT
# - SQLFRAME_LOG_LEVEL
# - SQLFRAME_LOG_FORMAT

[query]
# Maximum rows per frame when a request sets no maxRows (-1 = unlimited)
row_limit = 1000000

# Resample interval used when a request has none (ms, 0 = disabled)
default_interval_ms = 0

# Fill mode for resampled time series: previous, null or value:N
# fill_mode = "null"

[database]
# SQLite database used when --db is not given
# path = "./data.db"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/sqlframe/sqlframe.log"
"#
    .to_string()
}
