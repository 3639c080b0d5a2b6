//! Integration tests for mailform-template

use mail_parser::{MessageParser, MimeHeaders};
use mailform_template::*;
use std::sync::Arc;

fn renderer(reports: StaticReportEngine) -> TemplateRenderer {
    TemplateRenderer::new(Arc::new(EngineRegistry::default()), Arc::new(reports))
}

fn customer() -> RecordRef {
    JsonRecord::from_value(
        "res.partner",
        12,
        serde_json::json!({
            "name": "José Díaz",
            "email": "jose@example.com",
            "lang": "es",
            "company": {"name": "Acme", "email": "billing@acme.test"},
        }),
    )
    .into_ref()
}

fn invoice_reports() -> StaticReportEngine {
    StaticReportEngine::new().with_report(
        "account.invoice",
        ReportOutput {
            kind: "pdf".into(),
            content: b"PDFDATA".to_vec(),
            direct_print: false,
            filename: "invoice.pdf".into(),
        },
    )
}

#[test]
fn test_wire_output_parses_as_email() {
    let template = Template::new(1, "res.partner")
        .field(SimpleField::From, "self.company.name + \" <\" + self.company.email + \">\"")
        .to("self.name + \" <\" + self.email + \">\"")
        .subject("\"Café invoice for \" + self.name")
        .plain("\"Dear \" + self.name + \",\\nplease find your invoice attached.\"")
        .html("\"<p>Dear \" + self.name + \"</p>\"")
        .header("X-Template", "\"invoice\"")
        .report(ReportDefinition::new("account.invoice"));

    let message = renderer(invoice_reports())
        .render(&template, &customer(), &RenderContext::default())
        .unwrap();
    let bytes = message.to_bytes();
    let parsed = MessageParser::default().parse(&bytes).unwrap();

    assert_eq!(parsed.subject(), Some("Café invoice for José Díaz"));

    let from = parsed.from().and_then(|a| a.first()).unwrap();
    assert_eq!(from.address(), Some("billing@acme.test"));
    assert_eq!(from.name(), Some("Acme"));

    let to = parsed.to().and_then(|a| a.first()).unwrap();
    assert_eq!(to.address(), Some("jose@example.com"));
    assert_eq!(to.name(), Some("José Díaz"));

    assert_eq!(
        parsed.header("X-Template").and_then(|h| h.as_text()),
        Some("invoice")
    );

    let plain = parsed.body_text(0).unwrap();
    assert!(plain.starts_with("Dear José Díaz,"));
    assert!(plain.contains("please find your invoice attached."));
    assert!(parsed.body_html(0).unwrap().contains("<p>Dear José Díaz</p>"));

    assert_eq!(parsed.attachment_count(), 1);
    let attachment = parsed.attachment(0).unwrap();
    assert_eq!(attachment.attachment_name(), Some("invoice.pdf"));
    assert_eq!(attachment.contents(), b"PDFDATA");
}

#[test]
fn test_empty_fields_never_written() {
    let template = Template::new(1, "res.partner")
        .subject("\"Hello \" + self.name")
        .field(SimpleField::Cc, "")
        .field(SimpleField::Bcc, "\"\"");

    let message = renderer(StaticReportEngine::new())
        .render(&template, &customer(), &RenderContext::default())
        .unwrap();
    let bytes = message.to_bytes();
    let wire = String::from_utf8_lossy(&bytes);

    assert!(!wire.contains("\r\nCc:"));
    assert!(!wire.contains("\r\nBcc:"));
    assert!(!wire.contains("\r\nTo:"));

    let parsed = MessageParser::default().parse(&bytes).unwrap();
    assert!(parsed.cc().is_none());
    assert!(parsed.bcc().is_none());
    assert_eq!(parsed.text_body_count(), 1);
    assert_eq!(parsed.html_body_count(), 1);
}

#[test]
fn test_translated_render_uses_record_language() {
    let template = Template::new(1, "res.partner")
        .language("self.lang")
        .subject("\"Your invoice\"")
        .translation(
            "es",
            TemplateTranslation {
                subject: Some("\"Su factura\"".into()),
                plain: Some("\"Hola \" + self.name".into()),
                ..Default::default()
            },
        );
    let context = RenderContext::new("en");

    let message = renderer(StaticReportEngine::new())
        .render(&template, &customer(), &context)
        .unwrap();

    assert_eq!(message.subject(), Some("Su factura"));
    assert_eq!(message.plain(), "Hola José Díaz");
    assert_eq!(context.language(), "en");
}

#[test]
fn test_failed_render_produces_no_message() {
    let template = Template::new(1, "res.partner")
        .subject("self.no_such_field")
        .report(ReportDefinition::new("account.invoice"));

    let err = renderer(invoice_reports())
        .render(&template, &customer(), &RenderContext::default())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Evaluation);
    assert!(err.to_string().contains("subject"));
}

#[test]
fn test_unknown_attachment_extension() {
    let reports = StaticReportEngine::new().with_report(
        "export",
        ReportOutput::new("raw", b"\x00\x01".to_vec(), "export.zzz"),
    );
    let template = Template::new(1, "res.partner").report(ReportDefinition::new("export"));

    let message = renderer(reports)
        .render(&template, &customer(), &RenderContext::default())
        .unwrap();
    let attachment = message.attachments().next().unwrap();
    assert_eq!(attachment.content_type, mime::APPLICATION_OCTET_STREAM);
}

#[test]
fn test_sandbox_rejects_statements() {
    let template = Template::new(1, "res.partner").subject("let x = self.name; x");
    let err = renderer(StaticReportEngine::new())
        .render(&template, &customer(), &RenderContext::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::Evaluation {
            source: EvaluationError::Parse(_),
            ..
        }
    ));
}

#[test]
fn test_structural_header_rejected_at_render() {
    let template = Template::new(1, "res.partner")
        .subject("\"Hello\"")
        .header("Content-Type", "\"text/plain\"");

    let err = renderer(StaticReportEngine::new())
        .render(&template, &customer(), &RenderContext::default())
        .unwrap_err();

    assert!(matches!(&err, RenderError::InvalidHeaderName(name) if name == "Content-Type"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_internationalized_recipient_round_trip() {
    let template = Template::new(1, "res.partner")
        .to("\"josé@example.com\"")
        .subject("\"Hola\"");

    let message = renderer(StaticReportEngine::new())
        .render(&template, &customer(), &RenderContext::default())
        .unwrap();
    let bytes = message.to_bytes();
    let parsed = MessageParser::default().parse(&bytes).unwrap();

    let to = parsed.to().and_then(|a| a.first()).unwrap();
    assert_eq!(to.address(), Some("josé@example.com"));
    assert_eq!(to.name(), None);
}

#[test]
fn test_encoded_word_text_round_trip() {
    let template = Template::new(1, "res.partner")
        .subject("\"=?utf-8?b?SGk=?=\"")
        .header("X-Reference", "\"ref =?iso-8859-1?q?abc?= \" + self.name");

    let message = renderer(StaticReportEngine::new())
        .render(&template, &customer(), &RenderContext::default())
        .unwrap();
    let bytes = message.to_bytes();
    let parsed = MessageParser::default().parse(&bytes).unwrap();

    assert_eq!(parsed.subject(), Some("=?utf-8?b?SGk=?="));
    assert_eq!(
        parsed.header("X-Reference").and_then(|h| h.as_text()),
        Some("ref =?iso-8859-1?q?abc?= José Díaz")
    );
}
