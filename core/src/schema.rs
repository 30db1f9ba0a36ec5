//! Table schema model.
//!
//! # Design
//! `FieldType` is a sum type: only the `Enum` variant carries `values`, so a
//! `string` field with enum values cannot be represented. On the wire the
//! variant is the `type` tag and sits flat next to `isOptional`:
//!
//! ```json
//! { "type": "enum", "isOptional": false, "values": ["A", "B"] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of a table; used verbatim as a URL path segment.
pub type TableName = String;

/// Field name to field schema. Ordering is not significant to the backend.
pub type TableSchema = BTreeMap<String, FieldSchema>;

/// Every table visible to the project, keyed by table name.
pub type Tables = BTreeMap<TableName, TableSchema>;

/// The type of a single field. By convention exactly one field per table is
/// `Id`; the backend enforces that, not the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    Id,
    Integer,
    String,
    Boolean,
    Time,
    Enum { values: Vec<String> },
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Id => "id",
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Time => "time",
            FieldType::Enum { .. } => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub is_optional: bool,
}

impl FieldSchema {
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            is_optional: false,
        }
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            is_optional: true,
        }
    }

    pub fn id() -> Self {
        Self::required(FieldType::Id)
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::required(FieldType::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }
}
