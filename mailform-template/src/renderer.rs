//! Template rendering.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::attachment::{AttachmentBuilder, ReportEngine};
use crate::context::RenderContext;
use crate::engine::EngineRegistry;
use crate::error::{RenderError, Result};
use crate::evaluator::Evaluator;
use crate::message::{self, Header, HeaderValues, RenderedMessage};
use crate::record::RecordRef;
use crate::template::{SimpleField, Template};

/// Turns a template and a record into a [`RenderedMessage`].
#[derive(Clone)]
pub struct TemplateRenderer {
    evaluator: Evaluator,
    attachments: AttachmentBuilder,
}

impl TemplateRenderer {
    pub fn new(registry: Arc<EngineRegistry>, reports: Arc<dyn ReportEngine>) -> Self {
        Self {
            evaluator: Evaluator::new(registry),
            attachments: AttachmentBuilder::new(reports),
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Render `template` for `record`.
    ///
    /// When the template carries a language expression that evaluates to a
    /// non-empty value, `context` uses that language for the rest of the
    /// render and gets its previous language back afterwards, whether the
    /// render succeeds or not.
    pub fn render(&self, template: &Template, record: &RecordRef, context: &RenderContext) -> Result<RenderedMessage> {
        self.render_at(template, record, context, Utc::now())
    }

    /// [`TemplateRenderer::render`] with an explicit render time.
    pub fn render_at(
        &self,
        template: &Template,
        record: &RecordRef,
        context: &RenderContext,
        date: DateTime<Utc>,
    ) -> Result<RenderedMessage> {
        template.validate()?;
        if record.model() != template.model {
            return Err(RenderError::ModelMismatch {
                template: template.id,
                expected: template.model.clone(),
                actual: record.model().to_string(),
            });
        }
        self.evaluator.registry().get(&template.engine)?;

        debug!(
            template = %template.id,
            record = record.id(),
            engine = %template.engine,
            "Rendering template"
        );

        let language = self
            .evaluator
            .evaluate_field(template, "language", template.language.as_deref(), Some(record))?;
        let _language_guard = match language.trim() {
            "" => None,
            language => Some(context.override_language(language)),
        };

        let language = context.language();
        let template = template.localized(&language);
        let eval = |field: &str, expression: Option<&str>| {
            self.evaluator
                .evaluate_field(&template, field, expression, Some(record))
        };

        let mut values = HeaderValues::new();
        for field in SimpleField::ALL {
            let value = eval(field.field_name(), template.simple_field(field))?;
            values.insert(field, value);
        }

        let attachments = if template.reports.is_empty() {
            Vec::new()
        } else {
            self.attachments.build(&template, &**record, &language)?
        };

        let plain = eval("plain", template.plain.as_deref())?;
        let html = eval("html", template.html.as_deref())?;

        let headers = template
            .headers
            .iter()
            .map(|header| {
                let value = eval(&format!("header {}", header.name), Some(header.value.as_str()))?;
                Ok(Header::new(header.name.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(message::assemble_at(values, plain, html, headers, attachments, date))
    }
}
