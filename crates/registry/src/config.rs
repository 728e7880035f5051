//! Client configuration shared by every source of a registry.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use dirs_next::config_dir;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use stencil_api::{FetchSettings, validate_headers};
use stencil_util::expand_tilde;
use thiserror::Error;
use tracing::debug;

/// How a source is re-read when its cache is refreshed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshStrategy {
    /// Fetch the source URL again.
    #[default]
    LongPolling,
    /// Ask `<url>/versions` for the latest published version and fetch
    /// `<url>/versions/<n>`; skip the download when the version is unchanged.
    VersionBasedRefresh,
}

/// Configuration applied to every source of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StencilConfig {
    /// Per-request timeout in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Additional attempts after a failed fetch.
    pub fetch_retries: u32,
    /// Delay before the first retry in milliseconds; doubled per retry.
    pub fetch_backoff_min_ms: u64,
    /// Headers sent with every fetch.
    pub fetch_headers: IndexMap<String, String>,
    /// Whether cached snapshots are reloaded once they are older than the TTL.
    pub cache_auto_refresh: bool,
    /// Age in milliseconds after which a snapshot is reloaded on access.
    pub cache_ttl_ms: u64,
    pub refresh_strategy: RefreshStrategy,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            fetch_retries: 4,
            fetch_backoff_min_ms: 5_000,
            fetch_headers: IndexMap::new(),
            cache_auto_refresh: false,
            cache_ttl_ms: 24 * 60 * 60 * 1000,
            refresh_strategy: RefreshStrategy::LongPolling,
        }
    }
}

impl StencilConfig {
    /// Load the configuration from [`default_config_path`].
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&default_config_path())
    }

    /// Load and validate the configuration stored at `path`.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no stencil config found; using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: StencilConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::invalid("fetchTimeoutMs", "must be greater than zero"));
        }
        if self.cache_auto_refresh && self.cache_ttl_ms == 0 {
            return Err(ConfigError::invalid("cacheTtlMs", "must be greater than zero when cacheAutoRefresh is enabled"));
        }
        validate_headers(&self.fetch_headers).map_err(|error| ConfigError::invalid("fetchHeaders", error.to_string()))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn fetch_backoff_min(&self) -> Duration {
        Duration::from_millis(self.fetch_backoff_min_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Settings for the fetcher backing each source.
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: self.fetch_timeout(),
            retries: self.fetch_retries,
            backoff_min: self.fetch_backoff_min(),
            headers: self.fetch_headers.clone(),
        }
    }
}

/// Get the default path for the Stencil configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var("STENCIL_CONFIG_PATH")
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stencil")
        .join("config.json")
}

/// Errors raised while loading or validating a [`StencilConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
