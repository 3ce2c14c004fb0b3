//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag) or an explicit path
//! 2. `~/.mimir/config.toml` (user)
//! 3. `/etc/mimir/config.toml` (system)

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::providers::RetryConfig;
use crate::types::SelectionMode;
use crate::{MimirError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Mode used when the caller does not pick one (default: mixed).
    #[serde(default)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub coin: CoinConfig,
    #[serde(default)]
    pub cache: CacheOptions,
    /// Retry policy for every source. Absent means no retries.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Cache-vs-download coin.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinConfig {
    /// Upper bound of the draw (default: 100).
    #[serde(default = "default_upper_limit")]
    pub upper_limit: u32,
    /// Threshold; a draw above it downloads. Defaults to half the bound.
    #[serde(default)]
    pub step: Option<u32>,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            upper_limit: default_upper_limit(),
            step: None,
        }
    }
}

fn default_upper_limit() -> u32 {
    crate::select::coin::DEFAULT_UPPER_LIMIT
}

/// Per-source cache behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheOptions {
    /// Fail writes to a blocked cache instead of skipping them.
    #[serde(default)]
    pub throw_if_blocked: bool,
    /// Seed every cache from its source before the first request.
    #[serde(default)]
    pub prefetch: bool,
}

/// Bundled source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Kanye,
    Tronald,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Kanye => "kanye",
            SourceKind::Tronald => "tronald",
        }
    }
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Relative share of requests routed to this source (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Override the API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SourceConfig {
    pub fn new(kind: SourceKind, weight: u32) -> Self {
        Self {
            kind,
            weight,
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

fn default_weight() -> u32 {
    1
}

fn default_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.mimir/config.toml`
    /// 3. `/etc/mimir/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            MimirError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            MimirError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MimirError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        Ok(())
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(MimirError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".mimir").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/mimir/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(MimirError::Configuration(
            "No config file found. Create ~/.mimir/config.toml or /etc/mimir/config.toml"
                .to_string(),
        ))
    }
}
