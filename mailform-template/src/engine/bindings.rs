//! Rhai bindings for records.

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Map};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::EvaluationError;
use crate::record::{RecordId, RecordRef};

/// Record binding for Rhai expressions.
///
/// Attributes are fetched from the record only when an expression reads
/// them, so a template touching two fields never resolves the other fifty.
#[derive(Clone)]
pub struct RecordBinding {
    record: RecordRef,
}

impl RecordBinding {
    pub fn new(record: RecordRef) -> Self {
        Self { record }
    }

    /// Get the record id.
    pub fn get_id(&mut self) -> RecordId {
        self.record.id()
    }

    /// Get the model name.
    pub fn get_model(&mut self) -> String {
        self.record.model().to_string()
    }

    /// Resolve an attribute; backs both `self.name` and `self["name"]`.
    pub fn get_attribute(&mut self, name: ImmutableString) -> Result<Dynamic, Box<EvalAltResult>> {
        let value = self
            .record
            .attribute(name.as_str())
            .map_err(|e| Box::new(EvalAltResult::from(e.to_string())))?;
        Ok(json_to_dynamic(value))
    }
}

impl fmt::Debug for RecordBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.record.model(), self.record.id())
    }
}

/// Register the record type with an engine.
pub fn register_record_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<RecordBinding>("Record")
        .register_get("id", RecordBinding::get_id)
        .register_get("model", RecordBinding::get_model)
        .register_indexer_get(RecordBinding::get_attribute);
}

/// Convert a JSON attribute value to a Rhai value.
pub fn json_to_dynamic(value: JsonValue) -> Dynamic {
    match value {
        JsonValue::Null => Dynamic::UNIT,
        JsonValue::Bool(b) => Dynamic::from(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Dynamic::from(i),
            None => Dynamic::from(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => Dynamic::from(s),
        JsonValue::Array(items) => {
            let array: Array = items.into_iter().map(json_to_dynamic).collect();
            Dynamic::from(array)
        }
        JsonValue::Object(obj) => {
            let mut map = Map::new();
            for (key, val) in obj {
                map.insert(key.into(), json_to_dynamic(val));
            }
            Dynamic::from(map)
        }
    }
}

/// Convert a Rhai value to JSON.
pub fn dynamic_to_json(value: Dynamic) -> Result<JsonValue, EvaluationError> {
    if value.is_unit() {
        return Ok(JsonValue::Null);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(JsonValue::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Ok(JsonValue::Number(i.into()));
    }
    if let Ok(f) = value.as_float() {
        return serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .ok_or_else(|| EvaluationError::InvalidResult(format!("non-finite number {f}")));
    }
    if value.is_array() {
        let items = value.try_cast::<Array>().unwrap_or_default();
        return items
            .into_iter()
            .map(dynamic_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array);
    }
    if value.is_map() {
        let map = value.try_cast::<Map>().unwrap_or_default();
        let mut object = serde_json::Map::new();
        for (key, val) in map {
            object.insert(key.to_string(), dynamic_to_json(val)?);
        }
        return Ok(JsonValue::Object(object));
    }
    Ok(JsonValue::String(value.to_string()))
}

/// Coerce an expression result to message text.
///
/// Unit becomes the empty string; arrays and maps are written as JSON;
/// everything else uses its display form.
pub fn dynamic_to_text(value: Dynamic) -> Result<String, EvaluationError> {
    if value.is_unit() {
        Ok(String::new())
    } else if value.is_array() || value.is_map() {
        let json = dynamic_to_json(value)?;
        serde_json::to_string(&json).map_err(|e| EvaluationError::InvalidResult(e.to_string()))
    } else if let Some(record) = value.clone().try_cast::<RecordBinding>() {
        Ok(format!("{record:?}"))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_roundtrip() {
        let value = json!({"name": "Alice", "age": 30, "active": true, "tags": ["a", "b"]});
        let back = dynamic_to_json(json_to_dynamic(value.clone())).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn test_null_is_unit() {
        assert!(json_to_dynamic(JsonValue::Null).is_unit());
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(dynamic_to_text(Dynamic::UNIT).unwrap(), "");
        assert_eq!(dynamic_to_text(Dynamic::from("hi")).unwrap(), "hi");
        assert_eq!(dynamic_to_text(Dynamic::from(42_i64)).unwrap(), "42");
        assert_eq!(dynamic_to_text(Dynamic::from(true)).unwrap(), "true");
        assert_eq!(
            dynamic_to_text(json_to_dynamic(json!([1, "two"]))).unwrap(),
            r#"[1,"two"]"#
        );
    }
}
