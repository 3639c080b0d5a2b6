//! Storage collaborators: templates, records and filed mail.

use mailform_config::ConfigLoader;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::{RenderError, Result};
use crate::message::RenderedMessage;
use crate::record::{Record, RecordId, RecordRef};
use crate::template::{MailboxId, Template, TemplateId, Trigger, TriggerId};

/// Source of templates and triggers.
pub trait TemplateStore: Send + Sync {
    fn template(&self, id: TemplateId) -> Result<Template>;

    fn trigger(&self, id: TriggerId) -> Result<Trigger>;
}

/// Source of records.
pub trait RecordStore: Send + Sync {
    fn record(&self, model: &str, id: RecordId) -> Result<RecordRef>;
}

/// Identifier of a filed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MailId(pub Uuid);

impl MailId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MailId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination of rendered messages.
pub trait MailStore: Send + Sync {
    /// File `message` into `mailbox`.
    fn file(&self, message: &RenderedMessage, mailbox: &MailboxId) -> Result<MailId>;
}

/// Templates and triggers as stored in a catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateCatalog {
    pub templates: Vec<Template>,
    pub triggers: Vec<Trigger>,
}

impl TemplateCatalog {
    /// Load a catalog from a JSON or TOML file, chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let value = ConfigLoader::auto(path)?.load_file(path)?;
        let catalog: Self = serde_json::from_value(value)
            .map_err(|e| mailform_config::ConfigError::deserialization(path.display().to_string(), e))?;

        for template in &catalog.templates {
            template.validate()?;
        }
        debug!(
            path = %path.display(),
            templates = catalog.templates.len(),
            triggers = catalog.triggers.len(),
            "Loaded template catalog"
        );
        Ok(catalog)
    }
}

/// Template store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<TemplateId, Template>>,
    triggers: RwLock<HashMap<TriggerId, Trigger>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: TemplateCatalog) -> Self {
        let store = Self::new();
        for template in catalog.templates {
            store.insert_template(template);
        }
        for trigger in catalog.triggers {
            store.insert_trigger(trigger);
        }
        store
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_catalog(TemplateCatalog::from_file(path)?))
    }

    pub fn insert_template(&self, template: Template) {
        self.templates.write().insert(template.id, template);
    }

    pub fn insert_trigger(&self, trigger: Trigger) {
        self.triggers.write().insert(trigger.id, trigger);
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn template(&self, id: TemplateId) -> Result<Template> {
        self.templates
            .read()
            .get(&id)
            .cloned()
            .ok_or(RenderError::TemplateNotFound(id))
    }

    fn trigger(&self, id: TriggerId) -> Result<Trigger> {
        self.triggers
            .read()
            .get(&id)
            .cloned()
            .ok_or(RenderError::TriggerNotFound(id))
    }
}

/// Record store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<(String, RecordId), RecordRef>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: impl Record + 'static) {
        let key = (record.model().to_string(), record.id());
        self.records.write().insert(key, std::sync::Arc::new(record));
    }

    pub fn with(self, record: impl Record + 'static) -> Self {
        self.insert(record);
        self
    }
}

impl RecordStore for InMemoryRecordStore {
    fn record(&self, model: &str, id: RecordId) -> Result<RecordRef> {
        self.records
            .read()
            .get(&(model.to_string(), id))
            .cloned()
            .ok_or_else(|| RenderError::RecordNotFound {
                model: model.to_string(),
                id,
            })
    }
}

/// A message filed into an [`InMemoryMailStore`].
#[derive(Debug, Clone)]
pub struct FiledMail {
    pub id: MailId,
    pub mailbox: MailboxId,
    pub message: RenderedMessage,
    /// Wire form of the message.
    pub raw: Vec<u8>,
}

/// Mail store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryMailStore {
    mails: RwLock<Vec<FiledMail>>,
}

impl InMemoryMailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every filed message, oldest first.
    pub fn mails(&self) -> Vec<FiledMail> {
        self.mails.read().clone()
    }

    /// Messages filed into `mailbox`, oldest first.
    pub fn in_mailbox(&self, mailbox: &MailboxId) -> Vec<FiledMail> {
        self.mails
            .read()
            .iter()
            .filter(|mail| &mail.mailbox == mailbox)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mails.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mails.read().is_empty()
    }
}

impl MailStore for InMemoryMailStore {
    fn file(&self, message: &RenderedMessage, mailbox: &MailboxId) -> Result<MailId> {
        let id = MailId::new();
        self.mails.write().push(FiledMail {
            id,
            mailbox: mailbox.clone(),
            message: message.clone(),
            raw: message.to_bytes(),
        });
        Ok(id)
    }
}

/// Mail store writing one `.eml` file per message under
/// `<root>/<mailbox>/`.
#[derive(Debug, Clone)]
pub struct DirectoryMailStore {
    root: PathBuf,
}

impl DirectoryMailStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a message with this id is stored at.
    pub fn path_for(&self, mailbox: &MailboxId, id: MailId) -> PathBuf {
        self.root.join(mailbox.as_str()).join(format!("{id}.eml"))
    }
}

impl MailStore for DirectoryMailStore {
    fn file(&self, message: &RenderedMessage, mailbox: &MailboxId) -> Result<MailId> {
        let name = mailbox.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(RenderError::MailStore(format!("Invalid mailbox name: {name:?}")));
        }

        let id = MailId::new();
        let path = self.path_for(mailbox, id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, message.to_bytes())?;
        debug!(path = %path.display(), "Filed message");
        Ok(id)
    }
}
