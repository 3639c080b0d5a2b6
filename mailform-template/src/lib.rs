//! # Mailform Template
//!
//! Render multi-part email messages from templates bound to business records.
//!
//! ## Features
//!
//! - **Expression Templates**: every header and body is an expression
//!   evaluated against the record
//! - **Pluggable Engines**: engines are registered by identifier; the built-in
//!   `rhai` engine runs expressions in a sandbox
//! - **Report Attachments**: external reports become typed attachments
//! - **MIME Output**: `multipart/alternative` messages in RFC 5322 wire format
//! - **Batch Dispatch**: render for many records and file into a mailbox
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mailform_template::prelude::*;
//! use std::sync::Arc;
//!
//! let renderer = TemplateRenderer::new(
//!     Arc::new(EngineRegistry::default()),
//!     Arc::new(StaticReportEngine::new()),
//! );
//!
//! let template = Template::new(1, "res.partner")
//!     .to("self.email")
//!     .subject("\"Hello \" + self.name")
//!     .plain("\"Dear \" + self.name + \",\"");
//!
//! let record = JsonRecord::new("res.partner", 1)
//!     .with("name", "World")
//!     .with("email", "world@example.com")
//!     .into_ref();
//!
//! let message = renderer.render(&template, &record, &RenderContext::default())?;
//! assert_eq!(message.subject(), Some("Hello World"));
//! let wire = message.to_bytes();
//! ```
//!
//! ## Dispatching
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(renderer, templates, records, mail)
//!     .with_policy(BatchPolicy::Continue);
//!
//! let report = dispatcher.render_and_file(TemplateId(1), &[1, 2, 3])?;
//! println!("filed {}, skipped {}", report.filed.len(), report.failed.len());
//! ```

mod address;
mod attachment;
mod context;
mod dispatch;
mod engine;
mod error;
mod evaluator;
mod message;
mod record;
mod renderer;
mod settings;
mod store;
mod template;
mod wire;

pub use address::Mailbox;
pub use attachment::{
    Attachment, AttachmentBuilder, ReportContext, ReportEngine, ReportOutput, StaticReportEngine,
    guess_mime,
};
pub use context::{DEFAULT_LANGUAGE, LanguageGuard, RenderContext};
pub use dispatch::{BatchPolicy, DispatchReport, Dispatcher, Failed, Filed};
pub use engine::{
    DEFAULT_ENGINE, EngineDescriptor, EngineLimits, EngineRegistry, ExpressionEngine, FnEngine,
    RECORD_BINDING, RecordBinding, RhaiEngine, dynamic_to_json, dynamic_to_text, json_to_dynamic,
};
pub use error::{ErrorKind, EvaluationError, RenderError, ReportError, Result};
pub use evaluator::Evaluator;
pub use message::{
    Header, HeaderValues, Part, RenderedMessage, TextKind, TextPart, assemble, assemble_at,
};
pub use record::{JsonRecord, Record, RecordError, RecordId, RecordRef};
pub use renderer::TemplateRenderer;
pub use settings::{ENV_PREFIX, RenderSettings};
pub use store::{
    DirectoryMailStore, FiledMail, InMemoryMailStore, InMemoryRecordStore, InMemoryTemplateStore,
    MailId, MailStore, RecordStore, TemplateCatalog, TemplateStore,
};
pub use template::{
    HeaderTemplate, MailboxId, ReportDefinition, SimpleField, Template, TemplateId,
    TemplateTranslation, Trigger, TriggerId, is_reserved_header_name, is_valid_header_name,
};

/// Prelude for common imports.
///
/// ```
/// use mailform_template::prelude::*;
/// ```
pub mod prelude {
    pub use crate::attachment::{Attachment, ReportEngine, ReportOutput, StaticReportEngine};
    pub use crate::context::RenderContext;
    pub use crate::dispatch::{BatchPolicy, DispatchReport, Dispatcher};
    pub use crate::engine::{EngineRegistry, ExpressionEngine};
    pub use crate::error::{RenderError, Result};
    pub use crate::message::RenderedMessage;
    pub use crate::record::{JsonRecord, Record, RecordRef};
    pub use crate::renderer::TemplateRenderer;
    pub use crate::settings::RenderSettings;
    pub use crate::store::{
        DirectoryMailStore, InMemoryMailStore, InMemoryRecordStore, InMemoryTemplateStore,
        MailStore, RecordStore, TemplateStore,
    };
    pub use crate::template::{ReportDefinition, Template, TemplateId, TriggerId};
}
