//! Template and trigger definitions.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::engine::DEFAULT_ENGINE;
use crate::error::{RenderError, Result};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Template identifier.
    TemplateId
);
id_type!(
    /// Trigger identifier.
    TriggerId
);

/// Mail-store folder a template files its messages into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailboxId(pub String);

impl MailboxId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MailboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The standard address and threading fields a template may set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimpleField {
    From,
    Sender,
    To,
    Cc,
    Bcc,
    Subject,
    MessageId,
    InReplyTo,
}

impl SimpleField {
    /// All fields, in the order they appear in a rendered message.
    pub const ALL: [SimpleField; 8] = [
        SimpleField::From,
        SimpleField::Sender,
        SimpleField::To,
        SimpleField::Cc,
        SimpleField::Bcc,
        SimpleField::Subject,
        SimpleField::MessageId,
        SimpleField::InReplyTo,
    ];

    /// Wire header name.
    pub fn header_name(self) -> &'static str {
        match self {
            SimpleField::From => "From",
            SimpleField::Sender => "Sender",
            SimpleField::To => "To",
            SimpleField::Cc => "Cc",
            SimpleField::Bcc => "Bcc",
            SimpleField::Subject => "Subject",
            SimpleField::MessageId => "Message-ID",
            SimpleField::InReplyTo => "In-Reply-To",
        }
    }

    /// Template field name.
    pub fn field_name(self) -> &'static str {
        match self {
            SimpleField::From => "from",
            SimpleField::Sender => "sender",
            SimpleField::To => "to",
            SimpleField::Cc => "cc",
            SimpleField::Bcc => "bcc",
            SimpleField::Subject => "subject",
            SimpleField::MessageId => "message_id",
            SimpleField::InReplyTo => "in_reply_to",
        }
    }

    /// Whether the header carries mailboxes or message ids rather than free
    /// text.
    pub fn is_structured(self) -> bool {
        self != SimpleField::Subject
    }
}

impl fmt::Display for SimpleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Custom header: a name and the expression producing its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderTemplate {
    pub name: String,
    pub value: String,
}

/// Reference to an external report producing one attachment per render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDefinition {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Name the report engine knows the report by.
    pub report_name: String,
}

impl ReportDefinition {
    pub fn new(report_name: impl Into<String>) -> Self {
        let report_name = report_name.into();
        Self {
            name: report_name.clone(),
            report_name,
        }
    }
}

/// Per-language field overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateTranslation {
    pub from: Option<String>,
    pub sender: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: Option<String>,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub plain: Option<String>,
    pub html: Option<String>,
}

impl TemplateTranslation {
    fn apply(&self, template: &mut Template) {
        let overrides = [
            (&self.from, &mut template.from),
            (&self.sender, &mut template.sender),
            (&self.to, &mut template.to),
            (&self.cc, &mut template.cc),
            (&self.bcc, &mut template.bcc),
            (&self.subject, &mut template.subject),
            (&self.message_id, &mut template.message_id),
            (&self.in_reply_to, &mut template.in_reply_to),
            (&self.plain, &mut template.plain),
            (&self.html, &mut template.html),
        ];
        for (translated, field) in overrides {
            if let Some(value) = translated {
                *field = Some(value.clone());
            }
        }
    }
}

/// Email template bound to a record model.
///
/// Every text field holds an expression evaluated against the record by the
/// engine named in `engine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    #[serde(default)]
    pub name: String,
    pub model: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default)]
    pub bcc: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub plain: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub headers: Vec<HeaderTemplate>,
    #[serde(default)]
    pub reports: Vec<ReportDefinition>,
    #[serde(default)]
    pub mailbox: Option<MailboxId>,
    #[serde(default)]
    pub translations: BTreeMap<String, TemplateTranslation>,
}

fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

impl Template {
    /// Create an empty template for a model, using the default engine.
    pub fn new(id: impl Into<TemplateId>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            model: model.into(),
            engine: default_engine(),
            language: None,
            from: None,
            sender: None,
            to: None,
            cc: None,
            bcc: None,
            subject: None,
            message_id: None,
            in_reply_to: None,
            plain: None,
            html: None,
            headers: Vec::new(),
            reports: Vec::new(),
            mailbox: None,
            translations: BTreeMap::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn language(mut self, expression: impl Into<String>) -> Self {
        self.language = Some(expression.into());
        self
    }

    /// Set a simple field expression.
    pub fn field(mut self, field: SimpleField, expression: impl Into<String>) -> Self {
        *self.field_slot(field) = Some(expression.into());
        self
    }

    pub fn subject(self, expression: impl Into<String>) -> Self {
        self.field(SimpleField::Subject, expression)
    }

    pub fn to(self, expression: impl Into<String>) -> Self {
        self.field(SimpleField::To, expression)
    }

    pub fn plain(mut self, expression: impl Into<String>) -> Self {
        self.plain = Some(expression.into());
        self
    }

    pub fn html(mut self, expression: impl Into<String>) -> Self {
        self.html = Some(expression.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.headers.push(HeaderTemplate {
            name: name.into(),
            value: expression.into(),
        });
        self
    }

    pub fn report(mut self, report: ReportDefinition) -> Self {
        self.reports.push(report);
        self
    }

    pub fn mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = Some(MailboxId::new(mailbox));
        self
    }

    pub fn translation(mut self, language: impl Into<String>, translation: TemplateTranslation) -> Self {
        self.translations.insert(language.into(), translation);
        self
    }

    /// Expression configured for a simple field.
    pub fn simple_field(&self, field: SimpleField) -> Option<&str> {
        match field {
            SimpleField::From => self.from.as_deref(),
            SimpleField::Sender => self.sender.as_deref(),
            SimpleField::To => self.to.as_deref(),
            SimpleField::Cc => self.cc.as_deref(),
            SimpleField::Bcc => self.bcc.as_deref(),
            SimpleField::Subject => self.subject.as_deref(),
            SimpleField::MessageId => self.message_id.as_deref(),
            SimpleField::InReplyTo => self.in_reply_to.as_deref(),
        }
    }

    fn field_slot(&mut self, field: SimpleField) -> &mut Option<String> {
        match field {
            SimpleField::From => &mut self.from,
            SimpleField::Sender => &mut self.sender,
            SimpleField::To => &mut self.to,
            SimpleField::Cc => &mut self.cc,
            SimpleField::Bcc => &mut self.bcc,
            SimpleField::Subject => &mut self.subject,
            SimpleField::MessageId => &mut self.message_id,
            SimpleField::InReplyTo => &mut self.in_reply_to,
        }
    }

    /// Template view for a language.
    ///
    /// Looks up an exact translation first, then the primary subtag
    /// (`fr_FR` falls back to `fr`). Without a match the template itself is
    /// returned.
    pub fn localized(&self, language: &str) -> Cow<'_, Template> {
        let translation = self.translations.get(language).or_else(|| {
            let primary = language.split(['_', '-']).next().unwrap_or(language);
            self.translations.get(primary)
        });

        match translation {
            Some(translation) => {
                let mut view = self.clone();
                translation.apply(&mut view);
                Cow::Owned(view)
            }
            None => Cow::Borrowed(self),
        }
    }

    /// Check the template is usable before rendering anything with it.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(RenderError::MissingField("model"));
        }
        if self.engine.trim().is_empty() {
            return Err(RenderError::MissingField("engine"));
        }
        for header in &self.headers {
            if !is_valid_header_name(&header.name) || is_reserved_header_name(&header.name) {
                return Err(RenderError::InvalidHeaderName(header.name.clone()));
            }
        }
        Ok(())
    }
}

/// RFC 5322 field name: printable ASCII except the colon.
pub fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':')
}

/// Names the message structure owns: `Date`, `MIME-Version` and every
/// `Content-*` field.
pub fn is_reserved_header_name(name: &str) -> bool {
    name.eq_ignore_ascii_case("Date")
        || name.eq_ignore_ascii_case("MIME-Version")
        || name
            .get(..8)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("Content-"))
}

/// Binding between an external trigger and a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    #[serde(default)]
    pub name: String,
    pub model: String,
    pub template: TemplateId,
}

impl Trigger {
    pub fn new(id: impl Into<TriggerId>, model: impl Into<String>, template: impl Into<TemplateId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            model: model.into(),
            template: template.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greeting() -> Template {
        Template::new(1, "res.partner")
            .subject("\"Hello \" + self.name")
            .plain("\"Hi\"")
            .translation(
                "fr",
                TemplateTranslation {
                    subject: Some("\"Bonjour \" + self.name".into()),
                    ..Default::default()
                },
            )
    }

    #[test]
    fn test_localized_exact_match() {
        let template = greeting();
        let view = template.localized("fr");
        assert_eq!(view.subject.as_deref(), Some("\"Bonjour \" + self.name"));
        // Untranslated fields keep the base expression.
        assert_eq!(view.plain.as_deref(), Some("\"Hi\""));
    }

    #[test]
    fn test_localized_primary_subtag() {
        let template = greeting();
        assert_eq!(
            template.localized("fr_FR").subject.as_deref(),
            Some("\"Bonjour \" + self.name")
        );
        assert_eq!(
            template.localized("fr-CA").subject.as_deref(),
            Some("\"Bonjour \" + self.name")
        );
    }

    #[test]
    fn test_localized_without_translation_borrows() {
        let template = greeting();
        let view = template.localized("de");
        assert!(matches!(view, Cow::Borrowed(_)));
        assert_eq!(view.subject, template.subject);
    }

    #[test]
    fn test_validate() {
        assert!(greeting().validate().is_ok());

        let err = Template::new(2, "").validate().unwrap_err();
        assert!(matches!(err, RenderError::MissingField("model")));

        let err = Template::new(3, "res.partner").engine(" ").validate().unwrap_err();
        assert!(matches!(err, RenderError::MissingField("engine")));

        let err = Template::new(4, "res.partner")
            .header("X Bad", "\"v\"")
            .validate()
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidHeaderName(name) if name == "X Bad"));
    }

    #[test]
    fn test_header_name_syntax() {
        assert!(is_valid_header_name("X-Tryton-Model"));
        assert!(!is_valid_header_name(""));
        assert!(!is_valid_header_name("X:Y"));
        assert!(!is_valid_header_name("Ünïcode"));
    }

    #[test]
    fn test_structural_header_names_rejected() {
        for name in ["Content-Type", "content-transfer-encoding", "MIME-Version", "Date"] {
            let err = Template::new(5, "res.partner")
                .header(name, "\"text/plain\"")
                .validate()
                .unwrap_err();
            assert!(matches!(err, RenderError::InvalidHeaderName(ref n) if n == name));
        }
        assert!(is_reserved_header_name("Content-Disposition"));
        assert!(!is_reserved_header_name("X-Content"));
        assert!(!is_reserved_header_name("Subject"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let template: Template = serde_json::from_value(serde_json::json!({
            "id": 9,
            "model": "sale.sale",
            "subject": "\"Order\"",
            "headers": [{"name": "X-Kind", "value": "\"sale\""}],
            "reports": [{"report_name": "sale.report"}],
            "mailbox": "outbox"
        }))
        .unwrap();

        assert_eq!(template.id, TemplateId(9));
        assert_eq!(template.engine, DEFAULT_ENGINE);
        assert_eq!(template.simple_field(SimpleField::Subject), Some("\"Order\""));
        assert_eq!(template.simple_field(SimpleField::To), None);
        assert_eq!(template.reports[0].report_name, "sale.report");
        assert_eq!(template.mailbox, Some(MailboxId::new("outbox")));
    }

    #[test]
    fn test_simple_field_names() {
        assert_eq!(SimpleField::MessageId.header_name(), "Message-ID");
        assert_eq!(SimpleField::InReplyTo.field_name(), "in_reply_to");
        assert!(!SimpleField::Subject.is_structured());
        assert!(SimpleField::To.is_structured());
    }
}
