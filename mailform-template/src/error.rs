//! Rendering error types.

use mailform_config::ConfigError;
use thiserror::Error;

use crate::record::{RecordError, RecordId};
use crate::template::{TemplateId, TriggerId};

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template selects an engine that is not registered.
    #[error("Unknown expression engine: {0}")]
    UnknownEngine(String),

    /// Missing required template field.
    #[error("Missing required template field: {0}")]
    MissingField(&'static str),

    /// The record does not belong to the template's model.
    #[error("Template {template} renders '{expected}' records, got '{actual}'")]
    ModelMismatch {
        template: TemplateId,
        expected: String,
        actual: String,
    },

    /// A custom header name is malformed or belongs to the message structure.
    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),

    /// Template not found.
    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// Trigger not found.
    #[error("Trigger not found: {0}")]
    TriggerNotFound(TriggerId),

    /// Settings or catalog could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An expression failed to evaluate.
    #[error("Failed to evaluate {field}: {source}")]
    Evaluation {
        field: String,
        #[source]
        source: EvaluationError,
    },

    /// The report engine failed to produce an attachment.
    #[error("Report '{report}' failed: {source}")]
    Report {
        report: String,
        #[source]
        source: ReportError,
    },

    /// A non-empty expression was evaluated without a record.
    #[error("A record is required to evaluate a non-empty expression")]
    MissingRecord,

    /// Record not found in the record store.
    #[error("Record not found: {model},{id}")]
    RecordNotFound { model: String, id: RecordId },

    /// Attribute lookup on a record failed.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The mail store rejected the message.
    #[error("Mail store error: {0}")]
    MailStore(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`RenderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Misconfigured template, trigger or settings.
    Configuration,
    /// An expression raised.
    Evaluation,
    /// Report generation failed.
    Attachment,
    /// The record could not be resolved.
    MissingRecord,
    /// Filing the message failed.
    Storage,
}

impl RenderError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownEngine(_)
            | Self::MissingField(_)
            | Self::ModelMismatch { .. }
            | Self::InvalidHeaderName(_)
            | Self::TemplateNotFound(_)
            | Self::TriggerNotFound(_)
            | Self::Config(_) => ErrorKind::Configuration,
            Self::Evaluation { .. } | Self::Record(_) => ErrorKind::Evaluation,
            Self::Report { .. } => ErrorKind::Attachment,
            Self::MissingRecord | Self::RecordNotFound { .. } => ErrorKind::MissingRecord,
            Self::MailStore(_) | Self::Io(_) => ErrorKind::Storage,
        }
    }

    /// Whether this error aborts a whole dispatch batch.
    ///
    /// Configuration and attachment errors are fatal under every policy.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Attachment)
    }

    /// Create an evaluation error for a template field.
    pub fn evaluation(field: impl Into<String>, source: EvaluationError) -> Self {
        Self::Evaluation {
            field: field.into(),
            source,
        }
    }
}

/// Failure raised by an expression engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The expression could not be parsed, or uses a construct outside the
    /// engine's allow-list.
    #[error("parse error: {0}")]
    Parse(String),

    /// The expression raised while running.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The result could not be converted to text.
    #[error("invalid result: {0}")]
    InvalidResult(String),
}

/// Failure raised by an external report engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ReportError {
    pub message: String,
}

impl ReportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
