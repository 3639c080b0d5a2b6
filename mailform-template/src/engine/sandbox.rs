//! Sandboxed Rhai expression engine.

use rhai::packages::{
    ArithmeticPackage, BasicArrayPackage, BasicMapPackage, BasicMathPackage, BasicStringPackage,
    LanguageCorePackage, LogicPackage, MoreStringPackage, Package,
};
use rhai::{Dynamic, Engine, Scope};
use serde::{Deserialize, Serialize};

use super::ExpressionEngine;
use super::bindings::{RecordBinding, dynamic_to_text, register_record_api};
use crate::error::EvaluationError;
use crate::record::RecordRef;

/// Name the record is bound to inside expressions.
pub const RECORD_BINDING: &str = "self";

const DISABLED_SYMBOLS: [&str; 3] = ["eval", "print", "debug"];

/// Resource limits applied to every expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    /// Maximum operations per evaluation.
    pub max_operations: u64,
    /// Maximum function call depth.
    pub max_call_depth: usize,
    /// Maximum expression nesting depth.
    pub max_expr_depth: usize,
    /// Maximum string length.
    pub max_string_size: usize,
    /// Maximum array size.
    pub max_array_size: usize,
    /// Maximum map size.
    pub max_map_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_operations: 100_000,
            max_call_depth: 32,
            max_expr_depth: 64,
            max_string_size: 1024 * 1024, // 1MB
            max_array_size: 10_000,
            max_map_size: 10_000,
        }
    }
}

/// Rhai engine restricted to side-effect free expressions.
///
/// Only expressions compile: statements, loops, closures and imports are
/// parse errors. The single variable in scope is `self`, the record being
/// rendered. No package touching time, I/O or the host is loaded.
pub struct RhaiEngine {
    engine: Engine,
    limits: EngineLimits,
}

impl RhaiEngine {
    pub fn new(limits: EngineLimits) -> Self {
        let mut engine = Engine::new_raw();

        engine.register_global_module(LanguageCorePackage::new().as_shared_module());
        engine.register_global_module(ArithmeticPackage::new().as_shared_module());
        engine.register_global_module(LogicPackage::new().as_shared_module());
        engine.register_global_module(BasicStringPackage::new().as_shared_module());
        engine.register_global_module(MoreStringPackage::new().as_shared_module());
        engine.register_global_module(BasicMathPackage::new().as_shared_module());
        engine.register_global_module(BasicArrayPackage::new().as_shared_module());
        engine.register_global_module(BasicMapPackage::new().as_shared_module());

        // Apply limits
        engine.set_max_operations(limits.max_operations);
        engine.set_max_call_levels(limits.max_call_depth);
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(limits.max_array_size);
        engine.set_max_map_size(limits.max_map_size);

        engine.set_strict_variables(true);
        engine.set_fail_on_invalid_map_property(true);
        for symbol in DISABLED_SYMBOLS {
            engine.disable_symbol(symbol);
        }

        register_record_api(&mut engine);

        Self { engine, limits }
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }
}

impl Default for RhaiEngine {
    fn default() -> Self {
        Self::new(EngineLimits::default())
    }
}

impl ExpressionEngine for RhaiEngine {
    fn label(&self) -> &str {
        "Rhai"
    }

    fn evaluate(&self, expression: &str, record: &RecordRef) -> Result<String, EvaluationError> {
        let mut scope = Scope::new();
        scope.push_constant(RECORD_BINDING, RecordBinding::new(record.clone()));

        let ast = self
            .engine
            .compile_expression_with_scope(&scope, expression)
            .map_err(|e| EvaluationError::Parse(e.to_string()))?;

        let value: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, &ast)
            .map_err(|e| EvaluationError::Runtime(e.to_string()))?;

        dynamic_to_text(value)
    }
}
