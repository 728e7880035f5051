//! Shared handles to decoded message schemas.

use std::ops::Deref;
use std::sync::Arc;

use prost_types::{DescriptorProto, FieldDescriptorProto};

/// Decoded schema of a single protobuf message type.
#[derive(Debug, PartialEq)]
pub struct MessageSchema {
    /// Fully-qualified name without a leading dot (`pkg.Outer.Inner`).
    pub full_name: String,
    /// Proto package the message was declared in. Empty for the default package.
    pub package: String,
    /// Name of the `.proto` file that declared the message.
    pub file_name: String,
    /// Raw message descriptor as found in the descriptor set.
    pub proto: DescriptorProto,
}

/// Immutable, cheaply cloneable handle to a [`MessageSchema`].
///
/// Cloning a `Descriptor` clones the `Arc`, never the schema itself, so a
/// descriptor can be handed out by several registries without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor(Arc<MessageSchema>);

impl Descriptor {
    pub fn new(full_name: impl Into<String>, package: impl Into<String>, file_name: impl Into<String>, proto: DescriptorProto) -> Self {
        Self(Arc::new(MessageSchema {
            full_name: full_name.into(),
            package: package.into(),
            file_name: file_name.into(),
            proto,
        }))
    }

    /// Fully-qualified name, e.g. `com.example.Order`.
    pub fn full_name(&self) -> &str {
        &self.0.full_name
    }

    /// Short message name, e.g. `Order`.
    pub fn name(&self) -> &str {
        self.0.proto.name()
    }

    pub fn package(&self) -> &str {
        &self.0.package
    }

    pub fn file_name(&self) -> &str {
        &self.0.file_name
    }

    pub fn proto(&self) -> &DescriptorProto {
        &self.0.proto
    }

    pub fn fields(&self) -> &[FieldDescriptorProto] {
        &self.0.proto.field
    }

    /// Type reference in the form used by `FieldDescriptorProto.type_name`
    /// (a leading dot followed by the full name).
    pub fn type_name(&self) -> String {
        format!(".{}", self.0.full_name)
    }

    /// Returns `true` when both handles point at the same decoded schema.
    pub fn ptr_eq(&self, other: &Descriptor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Descriptor {
    type Target = MessageSchema;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A descriptor paired with its protobuf type reference.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorAndTypeName {
    pub descriptor: Descriptor,
    pub type_name: String,
}

impl From<&Descriptor> for DescriptorAndTypeName {
    fn from(descriptor: &Descriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
            type_name: descriptor.type_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_proto() -> DescriptorProto {
        DescriptorProto {
            name: Some("Order".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn clones_share_the_same_schema() {
        let descriptor = Descriptor::new("shop.Order", "shop", "shop/order.proto", order_proto());
        let cloned = descriptor.clone();
        assert!(descriptor.ptr_eq(&cloned));
        assert_eq!(cloned.name(), "Order");
    }

    #[test]
    fn equal_content_is_equal_but_not_identical() {
        let first = Descriptor::new("shop.Order", "shop", "shop/order.proto", order_proto());
        let second = Descriptor::new("shop.Order", "shop", "shop/order.proto", order_proto());
        assert_eq!(first, second);
        assert!(!first.ptr_eq(&second));
    }

    #[test]
    fn type_name_carries_leading_dot() {
        let descriptor = Descriptor::new("shop.Order", "shop", "shop/order.proto", order_proto());
        let pair = DescriptorAndTypeName::from(&descriptor);
        assert_eq!(pair.type_name, ".shop.Order");
        assert!(pair.descriptor.ptr_eq(&descriptor));
    }
}
