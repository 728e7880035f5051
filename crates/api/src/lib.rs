//! Descriptor set retrieval for Stencil sources.
//!
//! A source is identified by a URL. This crate turns that URL into the raw
//! bytes of a serialized `FileDescriptorSet`:
//!
//! - `http`/`https`: GET with the configured headers and timeout, retried
//!   with exponential backoff on transient failures
//! - `file`: read from the local filesystem
//!
//! The primary entry point is [`HttpDescriptorFetcher`], usually shared
//! behind the [`DescriptorFetcher`] trait.
//!
//! # Example
//!
//! ```ignore
//! use stencil_api::{DescriptorFetcher, FetchSettings, HttpDescriptorFetcher};
//!
//! let fetcher = HttpDescriptorFetcher::new(FetchSettings::default())?;
//! let bytes = fetcher.fetch("https://registry.example.com/descriptors.bin").await?;
//! ```

mod error;
mod fetcher;

pub use error::FetchError;
pub use fetcher::{DescriptorFetcher, FetchSettings, HttpDescriptorFetcher, validate_headers, validate_source_url};
