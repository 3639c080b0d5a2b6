//! Render-and-file batches.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::RenderContext;
use crate::error::{RenderError, Result};
use crate::record::RecordId;
use crate::renderer::TemplateRenderer;
use crate::store::{MailId, MailStore, RecordStore, TemplateStore};
use crate::template::{MailboxId, Template, TemplateId, TriggerId};

/// What a batch does when rendering one record fails.
///
/// Configuration and attachment errors abort the batch under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Record the failure and move on to the next record.
    #[default]
    Continue,
    /// Stop at the first failure.
    FailFast,
}

/// Message filed for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filed {
    pub record: RecordId,
    pub mail: MailId,
}

/// Record skipped by a [`BatchPolicy::Continue`] batch.
#[derive(Debug)]
pub struct Failed {
    pub record: RecordId,
    pub error: RenderError,
}

/// Outcome of a batch.
#[derive(Debug)]
pub struct DispatchReport {
    pub template: TemplateId,
    pub filed: Vec<Filed>,
    pub failed: Vec<Failed>,
}

impl DispatchReport {
    fn new(template: TemplateId) -> Self {
        Self {
            template,
            filed: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Whether every record was filed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Renders templates for batches of records and files the results.
pub struct Dispatcher {
    renderer: TemplateRenderer,
    templates: Arc<dyn TemplateStore>,
    records: Arc<dyn RecordStore>,
    mail: Arc<dyn MailStore>,
    context: RenderContext,
    policy: BatchPolicy,
}

impl Dispatcher {
    pub fn new(
        renderer: TemplateRenderer,
        templates: Arc<dyn TemplateStore>,
        records: Arc<dyn RecordStore>,
        mail: Arc<dyn MailStore>,
    ) -> Self {
        Self {
            renderer,
            templates,
            records,
            mail,
            context: RenderContext::default(),
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_context(mut self, context: RenderContext) -> Self {
        self.context = context;
        self
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Render `template_id` for each record in order and file every message
    /// into the template's mailbox.
    ///
    /// Messages filed before an aborting error stay filed.
    pub fn render_and_file(&self, template_id: TemplateId, record_ids: &[RecordId]) -> Result<DispatchReport> {
        let template = self.templates.template(template_id)?;
        self.file_batch(&template, record_ids)
    }

    /// Entry point for the trigger subsystem.
    ///
    /// The trigger must watch the model its template renders.
    pub fn mail_from_trigger(&self, record_ids: &[RecordId], trigger_id: TriggerId) -> Result<DispatchReport> {
        let trigger = self.templates.trigger(trigger_id)?;
        debug!(trigger = %trigger_id, template = %trigger.template, "Trigger fired");
        let template = self.templates.template(trigger.template)?;
        if trigger.model != template.model {
            return Err(RenderError::ModelMismatch {
                template: template.id,
                expected: template.model,
                actual: trigger.model,
            });
        }
        self.file_batch(&template, record_ids)
    }

    fn file_batch(&self, template: &Template, record_ids: &[RecordId]) -> Result<DispatchReport> {
        let template_id = template.id;
        template.validate()?;
        let mailbox = template
            .mailbox
            .clone()
            .ok_or(RenderError::MissingField("mailbox"))?;
        self.renderer.evaluator().registry().get(&template.engine)?;

        let mut report = DispatchReport::new(template_id);
        for &record_id in record_ids {
            match self.dispatch_one(template, &mailbox, record_id) {
                Ok(mail) => report.filed.push(Filed {
                    record: record_id,
                    mail,
                }),
                Err(error) if error.is_batch_fatal() || self.policy == BatchPolicy::FailFast => {
                    return Err(error);
                }
                Err(error) => {
                    warn!(template = %template_id, record = record_id, error = %error, "Skipping record");
                    report.failed.push(Failed {
                        record: record_id,
                        error,
                    });
                }
            }
        }

        info!(
            template = %template_id,
            filed = report.filed.len(),
            failed = report.failed.len(),
            "Batch complete"
        );
        Ok(report)
    }

    fn dispatch_one(&self, template: &Template, mailbox: &MailboxId, record_id: RecordId) -> Result<MailId> {
        let record = self.records.record(&template.model, record_id)?;
        let message = self.renderer.render(template, &record, &self.context)?;
        let mail = self.mail.file(&message, mailbox)?;
        debug!(record = record_id, mailbox = %mailbox, mail = %mail, "Filed message");
        Ok(mail)
    }
}
