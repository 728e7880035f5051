//! Single-source client backed by one descriptor set URL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stencil_api::validate_source_url;
use stencil_types::{Descriptor, DescriptorAndTypeName, DescriptorSet};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{DescriptorCacheLoader, StencilClient, StencilConfig, StencilError};

struct CachedSet {
    set: Arc<DescriptorSet>,
    loaded_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entry: Option<CachedSet>,
    closed: bool,
}

/// [`StencilClient`] for a single source URL.
///
/// The descriptor set is loaded on first access and cached. With
/// `cache_auto_refresh` enabled, an access after `cache_ttl_ms` reloads it;
/// a failed reload keeps serving the previous snapshot until the next TTL
/// window.
pub struct UrlStencilClient {
    url: String,
    loader: Arc<dyn DescriptorCacheLoader>,
    auto_refresh: bool,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl UrlStencilClient {
    /// Create a client for `url`. Nothing is fetched until the first read.
    pub fn new(url: impl Into<String>, config: &StencilConfig, loader: Arc<dyn DescriptorCacheLoader>) -> Result<Self, StencilError> {
        let url = url.into().trim().to_string();
        validate_source_url(&url).map_err(|error| StencilError::invalid_url(&url, error.to_string()))?;
        Ok(Self {
            url,
            loader,
            auto_refresh: config.cache_auto_refresh,
            ttl: config.cache_ttl(),
            state: RwLock::new(CacheState::default()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn is_stale(&self, entry: &CachedSet) -> bool {
        self.auto_refresh && entry.loaded_at.elapsed() >= self.ttl
    }

    /// Current snapshot, loading or reloading it when required.
    async fn snapshot(&self) -> Option<Arc<DescriptorSet>> {
        {
            let state = self.state.read().await;
            if state.closed {
                return None;
            }
            if let Some(entry) = &state.entry
                && !self.is_stale(entry)
            {
                return Some(Arc::clone(&entry.set));
            }
        }

        let mut state = self.state.write().await;
        if state.closed {
            return None;
        }
        // Another reader may have finished loading while this one waited.
        if let Some(entry) = &state.entry
            && !self.is_stale(entry)
        {
            return Some(Arc::clone(&entry.set));
        }

        let previous = state.entry.as_ref().map(|entry| Arc::clone(&entry.set));
        match self.loader.load(&self.url, previous.as_deref()).await {
            Ok(set) => {
                debug!(url = %self.url, descriptors = set.len(), "cached descriptor set");
                let set = Arc::new(set);
                state.entry = Some(CachedSet {
                    set: Arc::clone(&set),
                    loaded_at: Instant::now(),
                });
                Some(set)
            }
            Err(error) => {
                warn!(url = %self.url, %error, stale = previous.is_some(), "descriptor set load failed");
                // Serve the stale snapshot for another TTL before retrying.
                if let Some(entry) = state.entry.as_mut() {
                    entry.loaded_at = Instant::now();
                }
                previous
            }
        }
    }
}

#[async_trait]
impl StencilClient for UrlStencilClient {
    async fn get(&self, type_name: &str) -> Option<Descriptor> {
        self.snapshot().await?.get(type_name).cloned()
    }

    async fn get_all(&self) -> HashMap<String, Descriptor> {
        self.snapshot()
            .await
            .map(|set| set.descriptors().clone())
            .unwrap_or_default()
    }

    async fn type_name_to_package_name_map(&self) -> HashMap<String, String> {
        self.snapshot()
            .await
            .map(|set| set.type_name_to_package_name())
            .unwrap_or_default()
    }

    async fn all_descriptor_and_type_name(&self) -> HashMap<String, DescriptorAndTypeName> {
        self.snapshot()
            .await
            .map(|set| set.descriptor_and_type_names())
            .unwrap_or_default()
    }

    async fn refresh(&self) -> Result<(), StencilError> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(StencilError::closed(&self.url));
        }
        let previous = state.entry.as_ref().map(|entry| Arc::clone(&entry.set));
        let set = self.loader.load(&self.url, previous.as_deref()).await?;
        info!(url = %self.url, descriptors = set.len(), "refreshed descriptor set");
        state.entry = Some(CachedSet {
            set: Arc::new(set),
            loaded_at: Instant::now(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), StencilError> {
        let mut state = self.state.write().await;
        if !state.closed {
            debug!(url = %self.url, "closing descriptor client");
        }
        state.closed = true;
        state.entry = None;
        Ok(())
    }

    fn should_auto_refresh_cache(&self) -> bool {
        self.auto_refresh
    }
}
