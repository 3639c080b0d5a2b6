//! Report attachments.

use mime::Mime;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{RenderError, ReportError, Result};
use crate::record::{Record, RecordId};
use crate::template::Template;

/// Binary attachment carried by a rendered message.
///
/// Always sent base64-encoded with an `attachment` disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name.
    pub filename: String,
    /// MIME type.
    pub content_type: Mime,
    /// File content.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create a new attachment from bytes.
    pub fn new(filename: impl Into<String>, content_type: Mime, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data: data.into(),
        }
    }

    /// Create an attachment from bytes, guessing the type from the filename.
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let content_type = guess_mime(&filename);
        Self::new(filename, content_type, data)
    }

    /// Get the size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Guess a MIME type from a filename, defaulting to
/// `application/octet-stream`.
pub fn guess_mime(filename: &str) -> Mime {
    mime_guess::from_path(filename).first_or_octet_stream()
}

/// What a report engine returns for one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutput {
    /// Output format reported by the engine, e.g. `pdf`.
    pub kind: String,
    pub content: Vec<u8>,
    /// Whether the engine asked for the document to be printed directly.
    pub direct_print: bool,
    pub filename: String,
}

impl ReportOutput {
    pub fn new(kind: impl Into<String>, content: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
            direct_print: false,
            filename: filename.into(),
        }
    }
}

/// Context handed to the report engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub record_id: RecordId,
    pub language: String,
}

/// External document generator.
pub trait ReportEngine: Send + Sync {
    /// Run the named report for the given records.
    fn execute(
        &self,
        report_name: &str,
        record_ids: &[RecordId],
        context: &ReportContext,
    ) -> std::result::Result<ReportOutput, ReportError>;
}

/// Turns a template's report definitions into attachments.
#[derive(Clone)]
pub struct AttachmentBuilder {
    reports: Arc<dyn ReportEngine>,
}

impl AttachmentBuilder {
    pub fn new(reports: Arc<dyn ReportEngine>) -> Self {
        Self { reports }
    }

    /// Run every report of `template` for `record`, in declaration order.
    ///
    /// The first failing report aborts the build.
    pub fn build(&self, template: &Template, record: &dyn Record, language: &str) -> Result<Vec<Attachment>> {
        let context = ReportContext {
            record_id: record.id(),
            language: language.to_string(),
        };

        template
            .reports
            .iter()
            .map(|definition| {
                let output = self
                    .reports
                    .execute(&definition.report_name, &[record.id()], &context)
                    .map_err(|source| RenderError::Report {
                        report: definition.report_name.clone(),
                        source,
                    })?;

                let attachment = Attachment::from_bytes(output.filename, output.content);
                debug!(
                    report = %definition.report_name,
                    filename = %attachment.filename,
                    content_type = %attachment.content_type,
                    size = attachment.size(),
                    "Built report attachment"
                );
                Ok(attachment)
            })
            .collect()
    }
}

/// Report engine serving canned outputs by report name.
///
/// Every call is recorded so callers can check what was requested.
#[derive(Debug, Default)]
pub struct StaticReportEngine {
    outputs: HashMap<String, std::result::Result<ReportOutput, ReportError>>,
    calls: Mutex<Vec<(String, Vec<RecordId>, ReportContext)>>,
}

impl StaticReportEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `output` for `report_name`.
    pub fn with_report(mut self, report_name: impl Into<String>, output: ReportOutput) -> Self {
        self.outputs.insert(report_name.into(), Ok(output));
        self
    }

    /// Fail every execution of `report_name`.
    pub fn with_failure(mut self, report_name: impl Into<String>, message: impl Into<String>) -> Self {
        self.outputs
            .insert(report_name.into(), Err(ReportError::new(message)));
        self
    }

    /// Executions so far: report name, record ids and context.
    pub fn calls(&self) -> Vec<(String, Vec<RecordId>, ReportContext)> {
        self.calls.lock().clone()
    }
}

impl ReportEngine for StaticReportEngine {
    fn execute(
        &self,
        report_name: &str,
        record_ids: &[RecordId],
        context: &ReportContext,
    ) -> std::result::Result<ReportOutput, ReportError> {
        self.calls
            .lock()
            .push((report_name.to_string(), record_ids.to_vec(), context.clone()));

        self.outputs
            .get(report_name)
            .cloned()
            .unwrap_or_else(|| Err(ReportError::new(format!("Unknown report: {report_name}"))))
    }
}
