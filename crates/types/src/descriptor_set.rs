//! Decoding of serialized `google.protobuf.FileDescriptorSet` payloads.
//!
//! A [`DescriptorSet`] is the snapshot one source produces at one point in
//! time: every message type found in the payload (nested types included),
//! indexed by its fully-qualified name.

use std::collections::HashMap;

use prost::Message;
use prost_types::{DescriptorProto, FileDescriptorSet};
use thiserror::Error;

use crate::{Descriptor, DescriptorAndTypeName};

/// Errors produced while decoding a descriptor set payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed descriptor set: {0}")]
    Malformed(#[from] prost::DecodeError),

    #[error("message without a name in file '{file}'")]
    UnnamedMessage { file: String },
}

/// Snapshot of all message descriptors known to one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSet {
    descriptors: HashMap<String, Descriptor>,
    version: Option<u64>,
}

impl DescriptorSet {
    /// Decodes a serialized `FileDescriptorSet`.
    ///
    /// An empty payload is a valid, empty set. When two files declare the same
    /// fully-qualified name the later file wins.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let file_set = FileDescriptorSet::decode(bytes)?;
        Self::from_file_descriptor_set(file_set)
    }

    pub fn from_file_descriptor_set(file_set: FileDescriptorSet) -> Result<Self, DecodeError> {
        let mut descriptors = HashMap::new();
        for file in file_set.file {
            let package = file.package().to_string();
            let file_name = file.name().to_string();
            collect_messages(&package, &package, &file_name, &file.message_type, &mut descriptors)?;
        }
        Ok(Self {
            descriptors,
            version: None,
        })
    }

    /// Builds a set directly from already decoded descriptors.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = Descriptor>) -> Self {
        let descriptors = descriptors
            .into_iter()
            .map(|descriptor| (descriptor.full_name().to_string(), descriptor))
            .collect();
        Self {
            descriptors,
            version: None,
        }
    }

    /// Tags the snapshot with the published version it was fetched from.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn get(&self, full_name: &str) -> Option<&Descriptor> {
        self.descriptors.get(full_name)
    }

    pub fn descriptors(&self) -> &HashMap<String, Descriptor> {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Maps every fully-qualified name to the package it was declared in.
    pub fn type_name_to_package_name(&self) -> HashMap<String, String> {
        self.descriptors
            .iter()
            .map(|(name, descriptor)| (name.clone(), descriptor.package().to_string()))
            .collect()
    }

    pub fn descriptor_and_type_names(&self) -> HashMap<String, DescriptorAndTypeName> {
        self.descriptors
            .iter()
            .map(|(name, descriptor)| (name.clone(), DescriptorAndTypeName::from(descriptor)))
            .collect()
    }
}

fn collect_messages(
    scope: &str,
    package: &str,
    file_name: &str,
    messages: &[DescriptorProto],
    out: &mut HashMap<String, Descriptor>,
) -> Result<(), DecodeError> {
    for message in messages {
        let name = message.name();
        if name.is_empty() {
            return Err(DecodeError::UnnamedMessage {
                file: file_name.to_string(),
            });
        }
        let full_name = if scope.is_empty() { name.to_string() } else { format!("{scope}.{name}") };

        collect_messages(&full_name, package, file_name, &message.nested_type, out)?;
        out.insert(full_name.clone(), Descriptor::new(full_name, package, file_name, message.clone()));
    }
    Ok(())
}
