//! RFC 5322 / MIME serialization of rendered messages.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use mail_builder::MessageBuilder;
use mail_builder::headers::HeaderType;
use mail_builder::headers::address::Address;
use mail_builder::headers::content_type::ContentType;
use mail_builder::headers::date::Date;
use mail_builder::headers::raw::Raw;
use mail_builder::headers::text::Text;
use mail_builder::mime::MimePart;
use std::io::{self, Write};

use crate::address::Mailbox;
use crate::attachment::Attachment;
use crate::message::{Part, RenderedMessage, TextPart};
use crate::template::SimpleField;

// Raw bytes per encoded word: 75 chars minus `=?utf-8?b?` and `?=`.
const ENCODED_WORD_BYTES: usize = 45;

/// Write `message` as one `multipart/alternative` container holding the
/// attachments, the plain part and the HTML part, in that order.
pub(crate) fn write_message<W: Write>(message: &RenderedMessage, out: &mut W) -> io::Result<()> {
    let texts: Vec<(&TextPart, String)> = message
        .parts()
        .iter()
        .filter_map(|part| match part {
            Part::Text(text) => Some((text, normalize_newlines(&text.content))),
            Part::Attachment(_) => None,
        })
        .collect();
    let mut texts = texts.iter();

    let parts = message
        .parts()
        .iter()
        .filter_map(|part| match part {
            Part::Attachment(attachment) => Some(attachment_part(attachment)),
            Part::Text(_) => texts.next().map(|(text, body)| text_part(text, body)),
        })
        .collect::<Vec<_>>();

    let mut builder = MessageBuilder::new().header("Date", Date::new(message.date().timestamp()));
    for (field, value) in message.simple_headers().iter() {
        builder = builder.header(field.header_name(), simple_header(field, value));
    }
    for header in message.custom_headers() {
        builder = builder.header(header.name.as_str(), text_header(&header.value));
    }

    builder
        .body(MimePart::new("multipart/alternative", parts))
        .write_to(out)
}

fn simple_header(field: SimpleField, value: &str) -> HeaderType<'_> {
    match field {
        SimpleField::Subject => text_header(value),
        SimpleField::MessageId | SimpleField::InReplyTo => Raw::new(message_ids(value)).into(),
        _ => address_header(value),
    }
}

/// Address list header. Addresses are written as given, so
/// internationalized addresses survive; only display names get encoded.
fn address_header(value: &str) -> HeaderType<'_> {
    let mut addresses: Vec<Address<'static>> = Mailbox::parse_list(value)
        .into_iter()
        .map(|mailbox| Address::new_address(mailbox.name, mailbox.email))
        .collect();

    match addresses.len() {
        0 => text_header(value),
        1 => addresses.remove(0).into(),
        _ => Address::new_list(addresses).into(),
    }
}

/// Unstructured text. Text that already looks like an encoded word is
/// always encoded, so parsers hand back the same text.
fn text_header(value: &str) -> HeaderType<'_> {
    if value.contains("=?") {
        Raw::new(encoded_words(value).join("\r\n ")).into()
    } else {
        Text::new(value).into()
    }
}

/// `<id>` form of each whitespace separated message id.
fn message_ids(value: &str) -> String {
    value
        .split_whitespace()
        .map(|id| id.trim_start_matches('<').trim_end_matches('>'))
        .filter(|id| !id.is_empty())
        .map(|id| format!("<{id}>"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn text_part<'x>(text: &TextPart, body: &'x str) -> MimePart<'x> {
    let content_type = ContentType::new(format!("text/{}", text.kind.subtype())).attribute("charset", "utf-8");
    MimePart::new(content_type, body)
}

fn attachment_part(attachment: &Attachment) -> MimePart<'_> {
    let content_type = attachment
        .content_type
        .params()
        .fold(
            ContentType::new(attachment.content_type.essence_str()),
            |content_type, (name, value)| content_type.attribute(name.as_str(), value.as_str()),
        );
    MimePart::new(content_type, attachment.data.as_slice()).attachment(attachment.filename.as_str())
}

/// Convert any line ending to CRLF.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\r\n")
}

/// RFC 2047 encoded words for `text`, each within the 75 character limit.
fn encoded_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + ENCODED_WORD_BYTES).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        words.push(format!("=?utf-8?b?{}?=", STANDARD.encode(&text[start..end])));
        start = end;
    }
    words
}
