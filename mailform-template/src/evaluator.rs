//! Expression evaluation against records.

use std::sync::Arc;

use crate::engine::EngineRegistry;
use crate::error::{RenderError, Result};
use crate::record::RecordRef;
use crate::template::Template;

/// Evaluates template expressions with the engine each template selects.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<EngineRegistry>,
}

impl Evaluator {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Evaluate an expression for `template`.
    ///
    /// Absent and blank expressions evaluate to the empty string without
    /// consulting the engine or the record.
    pub fn evaluate(&self, template: &Template, expression: Option<&str>, record: Option<&RecordRef>) -> Result<String> {
        self.evaluate_field(template, "expression", expression, record)
    }

    /// Like [`Evaluator::evaluate`], naming the template field in errors.
    pub fn evaluate_field(
        &self,
        template: &Template,
        field: &str,
        expression: Option<&str>,
        record: Option<&RecordRef>,
    ) -> Result<String> {
        let Some(expression) = expression.filter(|e| !e.trim().is_empty()) else {
            return Ok(String::new());
        };
        let engine = self.registry.get(&template.engine)?;
        let record = record.ok_or(RenderError::MissingRecord)?;

        engine
            .evaluate(expression, record)
            .map_err(|source| RenderError::evaluation(field, source))
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Arc::new(EngineRegistry::default()))
    }
}
