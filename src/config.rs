//! Configuration management
//!
//! TOML configuration file support with environment variable overrides and
//! defaults.
//!
//! ```toml
//! [query]
//! default_list_limit = 1000
//! max_list_limit = 100000
//!
//! [groups]
//! path = "/var/lib/series/groups.json"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ValidationError};
use crate::selector::MatcherConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplicationConfig {
    /// Query evaluation settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Group persistence
    #[serde(default)]
    pub groups: GroupsConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query evaluation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// `list_limit` at startup
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,

    /// Largest value `alter database set list_limit` accepts
    #[serde(default = "default_max_list_limit")]
    pub max_list_limit: usize,

    /// Maximum regex pattern length
    #[serde(default = "default_max_regex_pattern_len")]
    pub max_regex_pattern_len: usize,

    /// Compiled regex size limit in bytes
    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit: usize,

    /// Compiled regexes kept in the cache
    #[serde(default = "default_regex_cache_entries")]
    pub regex_cache_entries: usize,

    /// Snapshot size from which matching runs in parallel
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

/// Group persistence configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GroupsConfig {
    /// JSON file groups are saved to (in-memory only when unset)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (error, warn, info, debug, trace or an EnvFilter directive)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target in log lines
    #[serde(default = "default_true")]
    pub with_target: bool,
}

// Default value functions
fn default_list_limit() -> usize { 1000 }
fn default_max_list_limit() -> usize { 100_000 }
fn default_max_regex_pattern_len() -> usize { 256 }
fn default_regex_size_limit() -> usize { 1024 * 1024 }
fn default_regex_cache_entries() -> usize { 1024 }
fn default_parallel_threshold() -> usize { 10_000 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_list_limit: default_list_limit(),
            max_list_limit: default_max_list_limit(),
            max_regex_pattern_len: default_max_regex_pattern_len(),
            regex_size_limit: default_regex_size_limit(),
            regex_cache_entries: default_regex_cache_entries(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
        }
    }
}

impl QueryConfig {
    /// Matcher settings derived from this configuration
    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            max_regex_pattern_len: self.max_regex_pattern_len,
            regex_size_limit: self.regex_size_limit,
            regex_cache_entries: self.regex_cache_entries,
            parallel_threshold: self.parallel_threshold,
        }
    }
}

impl ApplicationConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration from a file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides only
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> std::result::Result<(), ValidationError> {
        if let Ok(value) = std::env::var("SERIES_LIST_LIMIT") {
            self.query.default_list_limit = parse_env("SERIES_LIST_LIMIT", &value)?;
        }
        if let Ok(value) = std::env::var("SERIES_MAX_LIST_LIMIT") {
            self.query.max_list_limit = parse_env("SERIES_MAX_LIST_LIMIT", &value)?;
        }
        if let Ok(value) = std::env::var("SERIES_GROUPS_PATH") {
            self.groups.path = Some(PathBuf::from(value));
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let query = &self.query;

        if query.default_list_limit > query.max_list_limit {
            return Err(ValidationError::OutOfRange {
                field: "query.default_list_limit".to_string(),
                value: query.default_list_limit.to_string(),
                min: "0".to_string(),
                max: query.max_list_limit.to_string(),
            });
        }
        if query.max_regex_pattern_len == 0 {
            return Err(ValidationError::OutOfRange {
                field: "query.max_regex_pattern_len".to_string(),
                value: "0".to_string(),
                min: "1".to_string(),
                max: usize::MAX.to_string(),
            });
        }
        if query.regex_size_limit < 1024 {
            return Err(ValidationError::OutOfRange {
                field: "query.regex_size_limit".to_string(),
                value: query.regex_size_limit.to_string(),
                min: "1024".to_string(),
                max: usize::MAX.to_string(),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: "logging.level".to_string(),
                message: "log level cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn parse_env(field: &str, value: &str) -> std::result::Result<usize, ValidationError> {
    value.trim().parse().map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        message: format!("expected a non-negative integer, got '{}'", value),
    })
}
