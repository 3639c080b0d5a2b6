// Configuration management for Mailform
//
// Values are layered into a single JSON tree: files and environment variables
// are deep-merged in load order, later sources winning. Keys are dotted paths
// into that tree (`limits.max_operations`).

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat, parse_scalar};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Main configuration manager
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(Map::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load();
        debug!(count = env_vars.len(), prefix = ?self.env_prefix, "Loaded environment configuration");

        let mut config = self.config.write();
        for (key, value) in env_vars {
            insert_path(&mut config, &key, parse_scalar(&value))?;
        }

        Ok(())
    }

    /// Load configuration from .env file, then from the environment
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        self.load_env()
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        debug!(path = %path.display(), ?format, "Loaded configuration file");
        self.merge_value(data)
    }

    /// Merge a JSON object into the configuration tree
    pub fn merge_value(&self, data: Value) -> Result<()> {
        let Value::Object(map) = data else {
            return Err(ConfigError::LoadError(
                "Configuration root must be an object".to_string(),
            ));
        };

        let mut config = self.config.write();
        deep_merge(&mut config, map);
        Ok(())
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        let mut config = self.config.write();
        insert_path(&mut config, key, json_value)
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let config = self.config.read();

        let value =
            lookup_path(&config, key).ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone()).map_err(|e| ConfigError::deserialization(key, e))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        lookup_path(&self.config.read(), key).is_some()
    }

    /// Get all top-level configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Snapshot of the whole configuration tree
    pub fn snapshot(&self) -> Value {
        Value::Object(self.config.read().clone())
    }

    /// Deserialize the whole tree into `T` and validate it
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let validated: T = serde_json::from_value(self.snapshot())
            .map_err(|e| ConfigError::deserialization("<root>", e))?;

        validated.validate()?;

        Ok(validated)
    }
}

fn lookup_path<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

pub(crate) fn insert_path(map: &mut Map<String, Value>, key: &str, value: Value) -> Result<()> {
    let invalid = || ConfigError::LoadError(format!("Invalid configuration key: '{}'", key));

    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid());
    }
    let Some((last, parents)) = segments.split_last() else {
        return Err(invalid());
    };

    let mut current = map;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        // A scalar in the way is replaced by the nested table.
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().ok_or_else(invalid)?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn deep_merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("default_language", "fr").unwrap();

        let value: String = manager.get("default_language").unwrap();
        assert_eq!(value, "fr");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
    }

    #[test]
    fn test_nested_keys() {
        let manager = ConfigManager::new();
        manager.set("limits.max_operations", 500u64).unwrap();
        manager.set("limits.max_call_depth", 8u64).unwrap();

        assert!(manager.has("limits"));
        assert!(manager.has("limits.max_operations"));
        assert!(!manager.has("limits.max_map_size"));
        assert_eq!(manager.get::<u64>("limits.max_call_depth").unwrap(), 8);
        assert_eq!(manager.keys(), vec!["limits".to_string()]);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let manager = ConfigManager::new();
        assert!(manager.set("limits..max", 1).is_err());
    }

    #[test]
    fn test_deep_merge_keeps_siblings() {
        let manager = ConfigManager::new();
        manager
            .merge_value(serde_json::json!({"limits": {"max_operations": 1, "max_call_depth": 2}}))
            .unwrap();
        manager
            .merge_value(serde_json::json!({"limits": {"max_operations": 10}}))
            .unwrap();

        assert_eq!(manager.get::<u64>("limits.max_operations").unwrap(), 10);
        assert_eq!(manager.get::<u64>("limits.max_call_depth").unwrap(), 2);
    }

    #[test]
    fn test_merge_rejects_non_object() {
        let manager = ConfigManager::new();
        assert!(manager.merge_value(serde_json::json!([1, 2])).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Settings {
        language: String,
    }

    impl Validate for Settings {
        fn validate(&self) -> Result<()> {
            ConfigValidator::is_language(&self.language, "language")
        }
    }

    #[test]
    fn test_load_validated() {
        let manager = ConfigManager::new();
        manager.set("language", "de").unwrap();
        let settings: Settings = manager.load_validated().unwrap();
        assert_eq!(settings.language, "de");

        manager.set("language", "german").unwrap();
        let err = manager.load_validated::<Settings>().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
