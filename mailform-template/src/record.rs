//! Business records as seen by expressions.
//!
//! The renderer never knows the shape of a record. It only asks for
//! attributes by name through the [`Record`] capability.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Record identifier.
pub type RecordId = i64;

/// Shared handle to a record.
pub type RecordRef = Arc<dyn Record>;

/// Attribute lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record has no attribute with this name.
    #[error("{model} has no attribute '{name}'")]
    AttributeNotFound { model: String, name: String },
}

/// A named, identified entity whose attributes can be resolved by name.
pub trait Record: Send + Sync + fmt::Debug {
    /// Model (record type) name, e.g. `sale.sale`.
    fn model(&self) -> &str;

    /// Record identifier.
    fn id(&self) -> RecordId;

    /// Resolve one attribute.
    fn attribute(&self, name: &str) -> Result<Value, RecordError>;

    /// Resolve a dotted attribute path such as `partner.email`.
    ///
    /// The first segment is resolved on the record, the rest walk into
    /// nested objects.
    fn attribute_path(&self, path: &str) -> Result<Value, RecordError> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut value = self.attribute(first)?;

        for segment in segments {
            value = match value {
                Value::Object(mut map) => map.remove(segment),
                _ => None,
            }
            .ok_or_else(|| RecordError::AttributeNotFound {
                model: self.model().to_string(),
                name: path.to_string(),
            })?;
        }

        Ok(value)
    }
}

/// Record backed by a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRecord {
    model: String,
    id: RecordId,
    attributes: Map<String, Value>,
}

impl JsonRecord {
    /// Create an empty record.
    pub fn new(model: impl Into<String>, id: RecordId) -> Self {
        Self {
            model: model.into(),
            id,
            attributes: Map::new(),
        }
    }

    /// Create a record from a JSON object; non-objects yield no attributes.
    pub fn from_value(model: impl Into<String>, id: RecordId, value: Value) -> Self {
        let attributes = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            model: model.into(),
            id,
            attributes,
        }
    }

    /// Set an attribute.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> RecordRef {
        Arc::new(self)
    }
}

impl Record for JsonRecord {
    fn model(&self) -> &str {
        &self.model
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn attribute(&self, name: &str) -> Result<Value, RecordError> {
        if let Some(value) = self.attributes.get(name) {
            return Ok(value.clone());
        }
        if name == "id" {
            return Ok(Value::from(self.id));
        }
        Err(RecordError::AttributeNotFound {
            model: self.model.clone(),
            name: name.to_string(),
        })
    }
}
