// Mailform - email rendering from expression templates
//
// This library renders templates bound to business records into
// multi-part messages, attaches generated reports, and files the
// results into mailboxes.

// Re-export the rendering pipeline
pub use mailform_template::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use mailform_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Attachment,
        BatchPolicy,
        DirectoryMailStore,
        DispatchReport,
        Dispatcher,
        EngineRegistry,
        ExpressionEngine,
        InMemoryMailStore,
        InMemoryRecordStore,
        InMemoryTemplateStore,
        JsonRecord,
        MailStore,
        Record,
        RecordRef,
        RecordStore,
        RenderContext,
        RenderError,
        RenderSettings,
        RenderedMessage,
        ReportDefinition,
        ReportEngine,
        ReportOutput,
        StaticReportEngine,
        Template,
        TemplateId,
        TemplateRenderer,
        TemplateStore,
        TriggerId,
    };

    #[cfg(feature = "config")]
    pub use mailform_config::ConfigManager;
}
