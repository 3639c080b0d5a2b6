//! Rendered messages and their assembly.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::{self, Write};
use tracing::warn;

use crate::attachment::Attachment;
use crate::template::{SimpleField, is_reserved_header_name, is_valid_header_name};
use crate::wire;

/// A header as it appears in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Evaluated simple fields of a template.
///
/// Blank values are dropped on insert, so a field is either absent or
/// carries text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderValues {
    values: BTreeMap<SimpleField, String>,
}

impl HeaderValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, ignoring blank values.
    pub fn insert(&mut self, field: SimpleField, value: impl Into<String>) {
        let value = sanitize_header_value(&value.into());
        if value.is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    pub fn get(&self, field: SimpleField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Present fields in canonical header order.
    pub fn iter(&self) -> impl Iterator<Item = (SimpleField, &str)> {
        self.values.iter().map(|(field, value)| (*field, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Kind of text alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Plain,
    Html,
}

impl TextKind {
    /// MIME subtype under `text/`.
    pub fn subtype(self) -> &'static str {
        match self {
            TextKind::Plain => "plain",
            TextKind::Html => "html",
        }
    }
}

/// Text alternative of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    pub kind: TextKind,
    pub content: String,
}

/// One part of the multipart container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Attachment(Attachment),
    Text(TextPart),
}

/// Multi-part message produced by a render.
///
/// The container is `multipart/alternative` holding, in order, the
/// attachments, the plain-text part and the HTML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    date: DateTime<Utc>,
    simple: HeaderValues,
    custom: Vec<Header>,
    parts: Vec<Part>,
}

impl RenderedMessage {
    /// Render time.
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Value of a simple field, when present.
    pub fn simple_header(&self, field: SimpleField) -> Option<&str> {
        self.simple.get(field)
    }

    pub fn simple_headers(&self) -> &HeaderValues {
        &self.simple
    }

    pub fn subject(&self) -> Option<&str> {
        self.simple.get(SimpleField::Subject)
    }

    /// Custom headers in declaration order.
    pub fn custom_headers(&self) -> &[Header] {
        &self.custom
    }

    /// All headers in wire order: date, simple fields, custom headers.
    pub fn headers(&self) -> Vec<Header> {
        let mut headers = vec![Header::new("Date", self.date.to_rfc2822())];
        headers.extend(
            self.simple
                .iter()
                .map(|(field, value)| Header::new(field.header_name(), value)),
        );
        headers.extend(self.custom.iter().cloned());
        headers
    }

    /// First header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .into_iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value)
    }

    /// Every value of a header, in order.
    pub fn header_all(&self, name: &str) -> Vec<String> {
        self.headers()
            .into_iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value)
            .collect()
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.parts.iter().filter_map(|part| match part {
            Part::Attachment(attachment) => Some(attachment),
            Part::Text(_) => None,
        })
    }

    pub(crate) fn texts(&self) -> impl Iterator<Item = &TextPart> {
        self.parts.iter().filter_map(|part| match part {
            Part::Text(text) => Some(text),
            Part::Attachment(_) => None,
        })
    }

    fn text(&self, kind: TextKind) -> &str {
        self.texts()
            .find(|text| text.kind == kind)
            .map(|text| text.content.as_str())
            .unwrap_or_default()
    }

    /// Plain-text body.
    pub fn plain(&self) -> &str {
        self.text(TextKind::Plain)
    }

    /// HTML body.
    pub fn html(&self) -> &str {
        self.text(TextKind::Html)
    }

    /// Serialize to RFC 5322 wire format.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        wire::write_message(self, out)
    }

    /// Serialize to RFC 5322 wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        buffer
    }
}

/// Assemble a message stamped with the current time.
pub fn assemble(
    header_values: HeaderValues,
    plain: impl Into<String>,
    html: impl Into<String>,
    headers: Vec<Header>,
    attachments: Vec<Attachment>,
) -> RenderedMessage {
    assemble_at(header_values, plain, html, headers, attachments, Utc::now())
}

/// Assemble a message with an explicit render time.
///
/// Custom headers with a malformed or structural name are dropped.
pub fn assemble_at(
    header_values: HeaderValues,
    plain: impl Into<String>,
    html: impl Into<String>,
    headers: Vec<Header>,
    attachments: Vec<Attachment>,
    date: DateTime<Utc>,
) -> RenderedMessage {
    let mut parts: Vec<Part> = attachments.into_iter().map(Part::Attachment).collect();
    parts.push(Part::Text(TextPart {
        kind: TextKind::Plain,
        content: plain.into(),
    }));
    parts.push(Part::Text(TextPart {
        kind: TextKind::Html,
        content: html.into(),
    }));

    let custom = headers
        .into_iter()
        .filter(|header| {
            let usable =
                is_valid_header_name(&header.name) && !is_reserved_header_name(&header.name);
            if !usable {
                warn!(name = %header.name, "Dropping custom header with unusable name");
            }
            usable
        })
        .map(|header| Header {
            value: sanitize_header_value(&header.value),
            name: header.name,
        })
        .collect();

    RenderedMessage {
        date,
        simple: header_values,
        custom,
        parts,
    }
}

/// Collapse line breaks so evaluated text cannot inject headers.
fn sanitize_header_value(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
