//! Expression engines and their registry.
//!
//! A template names the engine its expressions are written for. Engines are
//! registered explicitly under an identifier; the renderer resolves the
//! identifier at render time and never falls back to another engine.

mod bindings;
mod sandbox;

pub use bindings::{RecordBinding, dynamic_to_json, dynamic_to_text, json_to_dynamic};
pub use sandbox::{EngineLimits, RECORD_BINDING, RhaiEngine};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{EvaluationError, RenderError, Result};
use crate::record::RecordRef;

/// Identifier of the built-in engine.
pub const DEFAULT_ENGINE: &str = "rhai";

/// Evaluates one expression against one record.
pub trait ExpressionEngine: Send + Sync {
    /// Human-readable name for selection lists.
    fn label(&self) -> &str;

    /// Evaluate `expression` with `record` bound, producing text.
    fn evaluate(&self, expression: &str, record: &RecordRef) -> std::result::Result<String, EvaluationError>;
}

/// Engine backed by a closure.
pub struct FnEngine<F> {
    label: String,
    func: F,
}

impl<F> FnEngine<F>
where
    F: Fn(&str, &RecordRef) -> std::result::Result<String, EvaluationError> + Send + Sync,
{
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<F> ExpressionEngine for FnEngine<F>
where
    F: Fn(&str, &RecordRef) -> std::result::Result<String, EvaluationError> + Send + Sync,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn evaluate(&self, expression: &str, record: &RecordRef) -> std::result::Result<String, EvaluationError> {
        (self.func)(expression, record)
    }
}

/// Registered engine, as listed for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDescriptor {
    pub id: String,
    pub label: String,
}

/// Table of engines keyed by identifier.
#[derive(Clone)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn ExpressionEngine>>,
}

impl EngineRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            engines: BTreeMap::new(),
        }
    }

    /// Create a registry holding the built-in engine.
    pub fn with_defaults(limits: &EngineLimits) -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_ENGINE, RhaiEngine::new(limits.clone()));
        registry
    }

    /// Register an engine, returning the one it replaces.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        engine: impl ExpressionEngine + 'static,
    ) -> Option<Arc<dyn ExpressionEngine>> {
        self.register_shared(id, Arc::new(engine))
    }

    /// Register an already shared engine.
    pub fn register_shared(
        &mut self,
        id: impl Into<String>,
        engine: Arc<dyn ExpressionEngine>,
    ) -> Option<Arc<dyn ExpressionEngine>> {
        self.engines.insert(id.into(), engine)
    }

    /// Builder form of [`EngineRegistry::register`].
    pub fn with_engine(mut self, id: impl Into<String>, engine: impl ExpressionEngine + 'static) -> Self {
        self.register(id, engine);
        self
    }

    /// Resolve an engine.
    pub fn get(&self, id: &str) -> Result<Arc<dyn ExpressionEngine>> {
        self.engines
            .get(id)
            .cloned()
            .ok_or_else(|| RenderError::UnknownEngine(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.engines.contains_key(id)
    }

    /// Registered engines, sorted by identifier.
    pub fn engines(&self) -> Vec<EngineDescriptor> {
        self.engines
            .iter()
            .map(|(id, engine)| EngineDescriptor {
                id: id.clone(),
                label: engine.label().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_defaults(&EngineLimits::default())
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}
