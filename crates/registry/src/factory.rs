//! Convenience constructors wiring clients to the HTTP fetcher.

use std::sync::Arc;

use stencil_api::HttpDescriptorFetcher;

use crate::{
    ConfigError, DescriptorCacheLoader, MultiUrlStencilClient, RemoteDescriptorCacheLoader, SchemaUpdateListener, StencilConfig,
    StencilError, UrlStencilClient,
};

/// Builds clients whose sources are fetched over HTTP or from local files.
///
/// # Examples
///
/// ```rust,no_run
/// use stencil_registry::{StencilClient, StencilClientFactory, StencilConfig};
///
/// # async fn run() -> Result<(), stencil_registry::StencilError> {
/// let config = StencilConfig::default();
/// let client = StencilClientFactory::multi_url_client(
///     ["https://registry.example.com/core", "https://registry.example.com/team"],
///     &config,
/// )?;
/// let order = client.get("shop.Order").await;
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct StencilClientFactory;

impl StencilClientFactory {
    /// Loader shared by every source of a client built from `config`.
    pub fn cache_loader(
        config: &StencilConfig,
        listener: Option<Arc<dyn SchemaUpdateListener>>,
    ) -> Result<Arc<dyn DescriptorCacheLoader>, StencilError> {
        config.validate()?;
        let fetcher = HttpDescriptorFetcher::new(config.fetch_settings())
            .map_err(|error| ConfigError::invalid("fetchHeaders", error.to_string()))?;
        let mut loader = RemoteDescriptorCacheLoader::new(Arc::new(fetcher), config.refresh_strategy);
        if let Some(listener) = listener {
            loader = loader.with_listener(listener);
        }
        Ok(Arc::new(loader))
    }

    pub fn url_client(url: impl Into<String>, config: &StencilConfig) -> Result<UrlStencilClient, StencilError> {
        UrlStencilClient::new(url, config, Self::cache_loader(config, None)?)
    }

    pub fn url_client_with_listener(
        url: impl Into<String>,
        config: &StencilConfig,
        listener: Arc<dyn SchemaUpdateListener>,
    ) -> Result<UrlStencilClient, StencilError> {
        UrlStencilClient::new(url, config, Self::cache_loader(config, Some(listener))?)
    }

    pub fn multi_url_client<I, S>(urls: I, config: &StencilConfig) -> Result<MultiUrlStencilClient, StencilError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MultiUrlStencilClient::new(urls, config, Self::cache_loader(config, None)?)
    }

    pub fn multi_url_client_with_listener<I, S>(
        urls: I,
        config: &StencilConfig,
        listener: Arc<dyn SchemaUpdateListener>,
    ) -> Result<MultiUrlStencilClient, StencilError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MultiUrlStencilClient::new(urls, config, Self::cache_loader(config, Some(listener))?)
    }
}
