//! Index descriptor: where and how one record kind is stored in the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Index name, type name, settings and mapping for one record kind.
///
/// The type name is unique within its index. Settings only take effect when
/// the index is created; changing them requires a new index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub index: String,

    #[serde(rename = "type")]
    pub doc_type: String,

    /// Shard, replica and analyzer settings sent on index creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,

    /// Field definitions sent with the type mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Value>,
}

impl IndexDescriptor {
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            settings: None,
            mapping: None,
        }
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Same type, settings and mapping stored under another index name.
    pub fn for_index(&self, index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..self.clone()
        }
    }
}
