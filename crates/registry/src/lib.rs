//! Protobuf descriptor registry clients.
//!
//! A [`UrlStencilClient`] serves the descriptors of one remote descriptor
//! set, caching them per its [`StencilConfig`]. A [`MultiUrlStencilClient`]
//! combines several clients into one registry. Both implement
//! [`StencilClient`], so either can be used wherever a registry is expected.
//!
//! Most callers start from [`StencilClientFactory`].

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod loader;
pub mod multi_url_client;
pub mod url_client;

pub use client::StencilClient;
pub use config::{ConfigError, RefreshStrategy, StencilConfig, default_config_path};
pub use error::StencilError;
pub use factory::StencilClientFactory;
pub use loader::{DescriptorCacheLoader, RemoteDescriptorCacheLoader, SchemaUpdateListener};
pub use multi_url_client::{FanOutReport, MemberOutcome, MultiUrlStencilClient};
pub use stencil_types::{Descriptor, DescriptorAndTypeName, DescriptorSet};
pub use url_client::UrlStencilClient;
