//! Rendering settings.

use mailform_config::{ConfigManager, ConfigValidator, Validate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::context::{DEFAULT_LANGUAGE, RenderContext};
use crate::dispatch::BatchPolicy;
use crate::engine::{EngineLimits, EngineRegistry};
use crate::error::Result;

/// Prefix of environment variables read by [`RenderSettings::from_env`].
pub const ENV_PREFIX: &str = "MAILFORM";

/// Settings for renderers and dispatchers.
///
/// Every key is optional; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Language active when a template does not pick one.
    pub default_language: String,
    pub batch_policy: BatchPolicy,
    /// Root directory for a `DirectoryMailStore`.
    pub mail_dir: Option<PathBuf>,
    pub limits: EngineLimits,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            batch_policy: BatchPolicy::default(),
            mail_dir: None,
            limits: EngineLimits::default(),
        }
    }
}

impl Validate for RenderSettings {
    fn validate(&self) -> mailform_config::Result<()> {
        ConfigValidator::not_empty(&self.default_language, "default_language")?;
        ConfigValidator::is_language(&self.default_language, "default_language")?;

        let limits = &self.limits;
        ConfigValidator::in_range(limits.max_operations, 1, u64::MAX, "limits.max_operations")?;
        ConfigValidator::in_range(limits.max_call_depth, 1, 1024, "limits.max_call_depth")?;
        ConfigValidator::in_range(limits.max_expr_depth, 1, 1024, "limits.max_expr_depth")?;
        ConfigValidator::in_range(limits.max_string_size, 1, usize::MAX, "limits.max_string_size")?;
        ConfigValidator::in_range(limits.max_array_size, 1, usize::MAX, "limits.max_array_size")?;
        ConfigValidator::in_range(limits.max_map_size, 1, usize::MAX, "limits.max_map_size")?;

        Ok(())
    }
}

impl RenderSettings {
    /// Read and validate settings from a configuration manager.
    pub fn load(config: &ConfigManager) -> Result<Self> {
        Ok(config.load_validated()?)
    }

    /// Read settings from `MAILFORM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let config = ConfigManager::with_prefix(ENV_PREFIX);
        config.load_env()?;
        Self::load(&config)
    }

    /// Engine registry with the built-in engine, honoring these limits.
    pub fn registry(&self) -> EngineRegistry {
        EngineRegistry::with_defaults(&self.limits)
    }

    /// Fresh render context in the default language.
    pub fn context(&self) -> RenderContext {
        RenderContext::new(self.default_language.clone())
    }
}
