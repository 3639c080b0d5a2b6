// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::BTreeMap;
use std::env;

/// Environment variable loader
///
/// With a prefix of `MAILFORM`, the variable `MAILFORM_DEFAULT_LANGUAGE` is
/// exposed as `default_language`. A double underscore separates nesting
/// levels: `MAILFORM_LIMITS__MAX_OPERATIONS` becomes `limits.max_operations`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all matching environment variables as dotted keys.
    pub fn load(&self) -> BTreeMap<String, String> {
        self.collect(env::vars())
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    fn full_key(&self, key: &str) -> String {
        let key = key.replace('.', "__").to_uppercase();
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key),
            None => key,
        }
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> BTreeMap<String, String> {
        let mut config = BTreeMap::new();

        for (key, value) in vars {
            let stripped = match self.prefix {
                Some(ref prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if rest.starts_with('_') => rest.trim_start_matches('_'),
                    _ => continue,
                },
                None => key.as_str(),
            };
            if stripped.is_empty() {
                continue;
            }
            config.insert(stripped.to_lowercase().replace("__", "."), value);
        }

        config
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
