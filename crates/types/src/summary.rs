//! Serializable views of descriptors for display and machine-readable output.

use prost_types::field_descriptor_proto::{Label, Type};
use serde::{Deserialize, Serialize};

use crate::Descriptor;

/// Flattened description of one message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorSummary {
    pub full_name: String,
    pub package: String,
    pub file: String,
    pub fields: Vec<FieldSummary>,
    /// Names of message types declared inside this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub name: String,
    pub number: i32,
    pub label: String,
    /// Scalar type name (`string`, `int64`, ...) or the referenced type for
    /// message and enum fields.
    pub r#type: String,
}

impl From<&Descriptor> for DescriptorSummary {
    fn from(descriptor: &Descriptor) -> Self {
        let fields = descriptor
            .fields()
            .iter()
            .map(|field| FieldSummary {
                name: field.name().to_string(),
                number: field.number(),
                label: label_name(field.label()).to_string(),
                r#type: match field.r#type() {
                    Type::Message | Type::Enum | Type::Group if !field.type_name().is_empty() => {
                        field.type_name().trim_start_matches('.').to_string()
                    }
                    other => other.as_str_name().trim_start_matches("TYPE_").to_lowercase(),
                },
            })
            .collect();
        let nested = descriptor
            .proto()
            .nested_type
            .iter()
            .map(|nested| format!("{}.{}", descriptor.full_name(), nested.name()))
            .collect();

        Self {
            full_name: descriptor.full_name().to_string(),
            package: descriptor.package().to_string(),
            file: descriptor.file_name().to_string(),
            fields,
            nested,
        }
    }
}

fn label_name(label: Label) -> &'static str {
    match label {
        Label::Optional => "optional",
        Label::Required => "required",
        Label::Repeated => "repeated",
    }
}
