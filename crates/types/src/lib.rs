//! Shared types for the Stencil descriptor registry.
//!
//! - [`Descriptor`]: shared handle to one decoded message schema
//! - [`DescriptorSet`]: every descriptor one source knows about, decoded from
//!   a serialized `FileDescriptorSet`
//! - [`DescriptorSummary`]: serializable view used for command line output

pub mod descriptor;
pub mod descriptor_set;
pub mod summary;

pub use descriptor::{Descriptor, DescriptorAndTypeName, MessageSchema};
pub use descriptor_set::{DecodeError, DescriptorSet};
pub use summary::{DescriptorSummary, FieldSummary};
