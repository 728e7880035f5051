//! Populating a source's cache from its remote descriptor set.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use stencil_api::DescriptorFetcher;
use stencil_types::{Descriptor, DescriptorSet};
use tracing::{debug, info};

use crate::{RefreshStrategy, StencilError};

/// Produces a fresh [`DescriptorSet`] for a source URL.
///
/// `previous` is the snapshot currently cached for the URL, if any, so
/// implementations can skip work when nothing changed.
#[async_trait]
pub trait DescriptorCacheLoader: Send + Sync {
    async fn load(&self, url: &str, previous: Option<&DescriptorSet>) -> Result<DescriptorSet, StencilError>;
}

/// Notified after a reload replaced a source's descriptors with different ones.
pub trait SchemaUpdateListener: Send + Sync {
    fn on_schema_update(&self, url: &str, descriptors: &HashMap<String, Descriptor>);
}

#[derive(Debug, Deserialize)]
struct VersionIndex {
    versions: Vec<u64>,
}

/// Loader that fetches and decodes descriptor sets over a [`DescriptorFetcher`].
pub struct RemoteDescriptorCacheLoader {
    fetcher: Arc<dyn DescriptorFetcher>,
    strategy: RefreshStrategy,
    listener: Option<Arc<dyn SchemaUpdateListener>>,
}

impl RemoteDescriptorCacheLoader {
    pub fn new(fetcher: Arc<dyn DescriptorFetcher>, strategy: RefreshStrategy) -> Self {
        Self {
            fetcher,
            strategy,
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn SchemaUpdateListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    async fn fetch_set(&self, url: &str) -> Result<DescriptorSet, StencilError> {
        let bytes = self.fetcher.fetch(url).await.map_err(|error| StencilError::fetch(url, error))?;
        DescriptorSet::decode(&bytes).map_err(|error| StencilError::decode(url, error))
    }

    async fn latest_version(&self, url: &str) -> Result<u64, StencilError> {
        let index_url = format!("{}/versions", url.trim_end_matches('/'));
        let bytes = self
            .fetcher
            .fetch(&index_url)
            .await
            .map_err(|error| StencilError::fetch(&index_url, error))?;
        let index: VersionIndex =
            serde_json::from_slice(&bytes).map_err(|error| StencilError::version_index(&index_url, error.to_string()))?;
        index
            .versions
            .into_iter()
            .max()
            .ok_or_else(|| StencilError::version_index(&index_url, "no versions published"))
    }
}

#[async_trait]
impl DescriptorCacheLoader for RemoteDescriptorCacheLoader {
    async fn load(&self, url: &str, previous: Option<&DescriptorSet>) -> Result<DescriptorSet, StencilError> {
        let loaded = match self.strategy {
            RefreshStrategy::LongPolling => self.fetch_set(url).await?,
            RefreshStrategy::VersionBasedRefresh => {
                let version = self.latest_version(url).await?;
                if let Some(previous) = previous
                    && previous.version() == Some(version)
                {
                    debug!(%url, version, "descriptor set version unchanged");
                    return Ok(previous.clone());
                }
                let versioned_url = format!("{}/versions/{version}", url.trim_end_matches('/'));
                self.fetch_set(&versioned_url).await?.with_version(version)
            }
        };

        debug!(%url, descriptors = loaded.len(), "loaded descriptor set");
        if let Some(previous) = previous
            && previous.descriptors() != loaded.descriptors()
        {
            info!(%url, descriptors = loaded.len(), "descriptor set changed");
            if let Some(listener) = &self.listener {
                listener.on_schema_update(url, loaded.descriptors());
            }
        }
        Ok(loaded)
    }
}
