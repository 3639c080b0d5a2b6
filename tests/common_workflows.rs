//! Integration tests for common Mailform workflows.
//!
//! These tests drive the whole pipeline: settings, catalog, rendering,
//! reports and filing.

use mail_parser::{MessageParser, MimeHeaders};
use mailform::mailform_config::{ConfigManager, FileFormat};
use mailform::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const CATALOG: &str = r#"{
    "templates": [
        {
            "id": 1,
            "name": "Invoice",
            "model": "account.invoice",
            "language": "self.lang",
            "from": "\"Billing <billing@acme.test>\"",
            "to": "self.partner.name + \" <\" + self.partner.email + \">\"",
            "subject": "\"Invoice \" + self.number",
            "plain": "\"Amount due: \" + self.amount",
            "html": "\"<p>Amount due: <b>\" + self.amount + \"</b></p>\"",
            "headers": [
                {"name": "X-Invoice", "value": "self.number"}
            ],
            "reports": [
                {"name": "Invoice PDF", "report_name": "account.invoice.pdf"}
            ],
            "mailbox": "outbox",
            "translations": {
                "fr": {
                    "subject": "\"Facture \" + self.number",
                    "plain": "\"Montant du : \" + self.amount"
                }
            }
        }
    ],
    "triggers": [
        {"id": 3, "name": "on_validate", "model": "account.invoice", "template": 1}
    ]
}"#;

fn invoice(id: i64, number: &str, lang: &str) -> JsonRecord {
    JsonRecord::from_value(
        "account.invoice",
        id,
        serde_json::json!({
            "number": number,
            "amount": 125.5,
            "lang": lang,
            "partner": {"name": "Ada Lovelace", "email": "ada@example.com"},
        }),
    )
}

fn settings(dir: &Path) -> RenderSettings {
    let path = dir.join("mailform.toml");
    fs::write(
        &path,
        format!(
            "default_language = \"en\"\nbatch_policy = \"continue\"\nmail_dir = {:?}\n\n[limits]\nmax_operations = 5000\n",
            dir.join("mail").display().to_string()
        ),
    )
    .unwrap();

    let config = ConfigManager::new();
    config.load_file(&path, FileFormat::Toml).unwrap();
    RenderSettings::load(&config).unwrap()
}

fn reports() -> StaticReportEngine {
    StaticReportEngine::new().with_report(
        "account.invoice.pdf",
        ReportOutput::new("pdf", b"%PDF-1.4 invoice".to_vec(), "invoice.pdf"),
    )
}

// =============================================================================
// Settings Tests
// =============================================================================

#[test]
fn test_settings_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());

    assert_eq!(settings.default_language, "en");
    assert_eq!(settings.batch_policy, BatchPolicy::Continue);
    assert_eq!(settings.mail_dir.as_deref(), Some(dir.path().join("mail").as_path()));
    assert_eq!(settings.limits.max_operations, 5000);
    assert_eq!(settings.limits.max_call_depth, 32);
}

// =============================================================================
// Dispatch Workflow Tests
// =============================================================================

#[test]
fn test_catalog_to_mailbox() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let catalog_path = dir.path().join("catalog.json");
    fs::write(&catalog_path, CATALOG).unwrap();

    let templates = InMemoryTemplateStore::from_file(&catalog_path).unwrap();
    let records = InMemoryRecordStore::new()
        .with(invoice(1, "INV/001", "en"))
        .with(invoice(2, "INV/002", "fr"));
    let mail_dir = settings.mail_dir.clone().unwrap();
    let store = DirectoryMailStore::new(&mail_dir);

    let renderer = TemplateRenderer::new(Arc::new(settings.registry()), Arc::new(reports()));
    let dispatcher = Dispatcher::new(
        renderer,
        Arc::new(templates),
        Arc::new(records),
        Arc::new(store.clone()),
    )
    .with_policy(settings.batch_policy)
    .with_context(settings.context());

    let report = dispatcher.render_and_file(TemplateId(1), &[1, 2]).unwrap();
    assert!(report.is_success());
    assert_eq!(report.filed.len(), 2);

    let outbox = MailboxId::new("outbox");
    let english = fs::read(store.path_for(&outbox, report.filed[0].mail)).unwrap();
    let parsed = MessageParser::default().parse(&english).unwrap();

    assert_eq!(parsed.subject(), Some("Invoice INV/001"));
    let to = parsed.to().and_then(|a| a.first()).unwrap();
    assert_eq!(to.address(), Some("ada@example.com"));
    assert_eq!(to.name(), Some("Ada Lovelace"));
    assert_eq!(
        parsed.header("X-Invoice").and_then(|h| h.as_text()),
        Some("INV/001")
    );
    assert_eq!(parsed.body_text(0).unwrap().trim(), "Amount due: 125.5");
    assert!(parsed.body_html(0).unwrap().contains("<b>125.5</b>"));
    assert_eq!(parsed.attachment_count(), 1);
    let attachment = parsed.attachment(0).unwrap();
    assert_eq!(attachment.attachment_name(), Some("invoice.pdf"));
    assert_eq!(attachment.contents(), b"%PDF-1.4 invoice");

    let french = fs::read(store.path_for(&outbox, report.filed[1].mail)).unwrap();
    let parsed = MessageParser::default().parse(&french).unwrap();
    assert_eq!(parsed.subject(), Some("Facture INV/002"));
    assert_eq!(parsed.body_text(0).unwrap().trim(), "Montant du : 125.5");

    // The dispatcher's language is untouched by per-record overrides.
    assert_eq!(dispatcher.context().language(), "en");
}

#[test]
fn test_trigger_with_skipped_records() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.json");
    fs::write(&catalog_path, CATALOG).unwrap();

    let records = InMemoryRecordStore::new()
        .with(invoice(1, "INV/001", "en"))
        .with(JsonRecord::new("account.invoice", 2).with("number", "INV/002"));
    let mail = Arc::new(InMemoryMailStore::new());
    let renderer = TemplateRenderer::new(Arc::new(EngineRegistry::default()), Arc::new(reports()));
    let dispatcher = Dispatcher::new(
        renderer,
        Arc::new(InMemoryTemplateStore::from_file(&catalog_path).unwrap()),
        Arc::new(records),
        mail.clone(),
    );

    let report = dispatcher.mail_from_trigger(&[2, 1, 40], TriggerId(3)).unwrap();

    assert_eq!(report.template, TemplateId(1));
    assert_eq!(report.filed.len(), 1);
    assert_eq!(report.filed[0].record, 1);
    assert_eq!(
        report.failed.iter().map(|f| f.record).collect::<Vec<_>>(),
        vec![2, 40]
    );
    assert_eq!(report.failed[0].error.kind(), ErrorKind::Evaluation);
    assert_eq!(report.failed[1].error.kind(), ErrorKind::MissingRecord);

    let filed = mail.in_mailbox(&MailboxId::new("outbox"));
    assert_eq!(filed.len(), 1);
    assert_eq!(filed[0].message.subject(), Some("Invoice INV/001"));
}

#[test]
fn test_fail_fast_from_settings() {
    let config = ConfigManager::new();
    config.set("batch_policy", "fail_fast").unwrap();
    let settings = RenderSettings::load(&config).unwrap();

    let templates = InMemoryTemplateStore::new();
    templates.insert_template(
        Template::new(1, "res.partner")
            .subject("\"Hi \" + self.name")
            .mailbox("outbox"),
    );
    let records = InMemoryRecordStore::new()
        .with(JsonRecord::new("res.partner", 1).with("name", "Ada"))
        .with(JsonRecord::new("res.partner", 2));
    let mail = Arc::new(InMemoryMailStore::new());

    let dispatcher = Dispatcher::new(
        TemplateRenderer::new(Arc::new(settings.registry()), Arc::new(StaticReportEngine::new())),
        Arc::new(templates),
        Arc::new(records),
        mail.clone(),
    )
    .with_policy(settings.batch_policy);

    let err = dispatcher.render_and_file(TemplateId(1), &[1, 2, 1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Evaluation);
    assert_eq!(mail.len(), 1);
}

// =============================================================================
// Custom Engine Tests
// =============================================================================

#[test]
fn test_custom_engine_registration() {
    let mut registry = EngineRegistry::default();
    registry.register(
        "upper",
        FnEngine::new("Upper", |expression: &str, record: &RecordRef| {
            let value = record
                .attribute(expression.trim())
                .map_err(|e| EvaluationError::Runtime(e.to_string()))?;
            Ok(value.as_str().unwrap_or_default().to_uppercase())
        }),
    );

    let labels: Vec<_> = registry.engines().into_iter().map(|d| d.label).collect();
    assert!(labels.contains(&"Upper".to_string()));

    let template = Template::new(1, "res.partner").engine("upper").subject("name");
    let record = JsonRecord::new("res.partner", 1).with("name", "ada").into_ref();
    let message = TemplateRenderer::new(Arc::new(registry), Arc::new(StaticReportEngine::new()))
        .render(&template, &record, &RenderContext::default())
        .unwrap();

    assert_eq!(message.subject(), Some("ADA"));
}
