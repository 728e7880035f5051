//! The capability shared by single-source and aggregate registries.

use std::collections::HashMap;

use async_trait::async_trait;
use stencil_types::{Descriptor, DescriptorAndTypeName};

use crate::StencilError;

/// A registry of protobuf message descriptors keyed by fully-qualified name.
///
/// Implemented by [`crate::UrlStencilClient`] for one source and by
/// [`crate::MultiUrlStencilClient`] for an ordered list of clients, so an
/// aggregate can stand in wherever a single client is expected (including as
/// a member of another aggregate).
///
/// Read operations never fail: a source that cannot serve a request answers
/// with `None` or an empty map and logs the reason.
#[async_trait]
pub trait StencilClient: Send + Sync {
    /// Descriptor for `type_name`, if this registry knows it.
    async fn get(&self, type_name: &str) -> Option<Descriptor>;

    /// Every descriptor this registry knows, keyed by full name.
    async fn get_all(&self) -> HashMap<String, Descriptor>;

    /// Full name to proto package for every known type.
    async fn type_name_to_package_name_map(&self) -> HashMap<String, String>;

    /// Full name to descriptor and its `.pkg.Type` reference.
    async fn all_descriptor_and_type_name(&self) -> HashMap<String, DescriptorAndTypeName>;

    /// Reload cached descriptors now, regardless of the auto-refresh setting.
    async fn refresh(&self) -> Result<(), StencilError>;

    /// Release cached descriptors. Reads after `close` return nothing.
    async fn close(&self) -> Result<(), StencilError>;

    /// Whether cached descriptors are reloaded automatically once stale.
    fn should_auto_refresh_cache(&self) -> bool;
}
