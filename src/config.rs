//! Configuration management for ip-enrich.
//!
//! Settings come from three layers, later ones winning:
//! built-in defaults, `IPENRICH_*` environment variables, command-line flags.

use std::time::Duration;

use thiserror::Error;

use crate::cli::Cli;
use crate::errors::IpEnrichError;
use crate::executor::{DEFAULT_TIMEOUT, MAX_BODY_SIZE};
use crate::output::OutputFormat;

pub const ENV_TIMEOUT_SECS: &str = "IPENRICH_TIMEOUT_SECS";
pub const ENV_MAX_BODY_BYTES: &str = "IPENRICH_MAX_BODY_BYTES";
pub const ENV_SOURCES: &str = "IPENRICH_SOURCES";
pub const ENV_OUTPUT: &str = "IPENRICH_OUTPUT";

/// Longest accepted run deadline.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub network: NetworkConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Deadline for the whole run; also the HTTP client timeout.
    pub timeout: Duration,

    /// Bytes kept from each response body.
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Requested source ids; empty selects every registered source.
    pub sources: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_body_size: MAX_BODY_SIZE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with whatever `IPENRICH_*` variables parse.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS)
            && let Ok(secs) = timeout.trim().parse::<u64>()
        {
            config.network.timeout = Duration::from_secs(secs);
        }

        if let Some(max) = lookup(ENV_MAX_BODY_BYTES)
            && let Ok(bytes) = max.trim().parse::<usize>()
        {
            config.network.max_body_size = bytes;
        }

        if let Some(sources) = lookup(ENV_SOURCES) {
            config.output.sources = split_ids(&sources);
        }

        if let Some(format) = lookup(ENV_OUTPUT)
            && let Ok(format) = format.parse::<OutputFormat>()
        {
            config.output.format = format;
        }

        config
    }

    /// Merge with CLI arguments, giving CLI precedence.
    pub fn merge_with_cli(&mut self, cli: &Cli) {
        if let Some(secs) = cli.timeout {
            self.network.timeout = Duration::from_secs(secs);
        }

        if let Some(format) = cli.output {
            self.output.format = format;
        }

        if let Some(ref sources) = cli.sources {
            self.output.sources = split_ids(sources);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "network.timeout".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if self.network.timeout > MAX_TIMEOUT {
            return Err(ConfigError::InvalidValue {
                field: "network.timeout".to_string(),
                value: self.network.timeout.as_secs().to_string(),
                reason: format!("Timeout must be at most {} seconds", MAX_TIMEOUT.as_secs()),
            });
        }

        if self.network.max_body_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.max_body_size".to_string(),
                value: "0".to_string(),
                reason: "Body limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Split a comma separated id list, dropping blanks.
pub fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl From<ConfigError> for IpEnrichError {
    fn from(e: ConfigError) -> Self {
        IpEnrichError::configuration(e.to_string())
    }
}
