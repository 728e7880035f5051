use stencil_api::FetchError;
use stencil_types::DecodeError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by Stencil clients and cache loaders.
#[derive(Debug, Error)]
pub enum StencilError {
    #[error("at least one descriptor source URL is required")]
    NoSources,

    #[error("invalid descriptor source '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to fetch descriptors from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to decode descriptors from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },

    #[error("invalid version index at {url}: {reason}")]
    VersionIndex { url: String, reason: String },

    #[error("client for {url} is closed")]
    Closed { url: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StencilError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn fetch(url: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch { url: url.into(), source }
    }

    pub fn decode(url: impl Into<String>, source: DecodeError) -> Self {
        Self::Decode { url: url.into(), source }
    }

    pub fn version_index(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VersionIndex {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn closed(url: impl Into<String>) -> Self {
        Self::Closed { url: url.into() }
    }
}
