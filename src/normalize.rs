//! Header/body normalizer — parses a raw RFC822 message into decoded headers
//! and a single cleaned plain-text body.
//!
//! Parse failure is never fatal: the normalizer degrades to a
//! `NormalizedEmail` with empty textual fields and the raw message placed
//! verbatim (lossy UTF-8) into `body`.

use std::sync::LazyLock;

use mail_parser::{HeaderValue, MessageParser, MimeHeaders, PartType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// First `smtp.mailfrom=` occurrence in an SPF / Authentication-Results
/// field; the first match in the raw message wins.
static SPF_MAILFROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"smtp\.mailfrom=([^\s;>]+)").unwrap());

static HTML_LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</tr>").unwrap());

static HTML_INVISIBLE_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());

/// One email reduced to decoded headers and a plain-text body.
/// Immutable once constructed; consumed by the cleaner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEmail {
    pub subject: String,
    pub sender_display: String,
    pub sender_verified_email: Option<String>,
    pub recipients: Vec<String>,
    pub date: String,
    pub body: String,
}

/// Parse one raw RFC822 message. Never fails; unparseable input yields the
/// degraded fallback form.
pub fn normalize_message(raw: &[u8]) -> NormalizedEmail {
    let Some(message) = MessageParser::default().parse(raw) else {
        return NormalizedEmail {
            subject: String::new(),
            sender_display: String::new(),
            sender_verified_email: None,
            recipients: Vec::new(),
            date: String::new(),
            body: String::from_utf8_lossy(raw).into_owned(),
        };
    };

    let subject = message.subject().unwrap_or_default().to_string();
    let sender_display = extract_sender_display(&message);
    let recipients = extract_recipients(&message);
    let date = extract_date(&message);
    let sender_verified_email = extract_verified_sender(raw);
    let body = extract_body(&message);

    NormalizedEmail {
        subject,
        sender_display,
        sender_verified_email,
        recipients,
        date,
        body,
    }
}

/// Message-ID plus a reply-thread hint (first `In-Reply-To` id) for
/// persistence bookkeeping. Messages without a Message-ID get a generated
/// one so duplicate detection stays possible downstream.
pub fn extract_message_ids(raw: &[u8]) -> (String, Option<String>) {
    let Some(message) = MessageParser::default().parse(raw) else {
        return (format!("gen-{}", Uuid::new_v4()), None);
    };

    let message_id = message
        .message_id()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("gen-{}", Uuid::new_v4()));

    let thread_id = match message.in_reply_to() {
        HeaderValue::Text(id) => Some(id.to_string()),
        HeaderValue::TextList(ids) => ids.first().map(|id| id.to_string()),
        _ => None,
    };

    (message_id, thread_id)
}

/// Extract the verified originating address from an SPF or
/// Authentication-Results field. Absence is not an error.
pub fn extract_verified_sender(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    SPF_MAILFROM
        .captures(&text)
        .map(|caps| caps[1].to_string())
}

/// Sender as "Name <address>", falling back to whichever half exists.
fn extract_sender_display(message: &mail_parser::Message) -> String {
    let Some(addr) = message.from().and_then(|a| a.first()) else {
        return String::new();
    };
    match (addr.name(), addr.address()) {
        (Some(name), Some(email)) => format!("{name} <{email}>"),
        (Some(name), None) => name.to_string(),
        (None, Some(email)) => email.to_string(),
        (None, None) => String::new(),
    }
}

/// Recipient addresses in header order.
fn extract_recipients(message: &mail_parser::Message) -> Vec<String> {
    message
        .to()
        .map(|addrs| {
            addrs
                .iter()
                .filter_map(|a| a.address().or(a.name()))
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Message date as RFC 3339, or empty when missing/invalid.
fn extract_date(message: &mail_parser::Message) -> String {
    message.date().map(|d| d.to_rfc3339()).unwrap_or_default()
}

/// Walk all MIME parts, skipping attachments. Plain-text parts are
/// accumulated separately from HTML parts; if any plain text was found it is
/// used in full, otherwise the HTML is used with tags stripped. Single-part
/// messages fall out of the same walk.
fn extract_body(message: &mail_parser::Message) -> String {
    let mut plain = String::new();
    let mut html = String::new();

    for part in &message.parts {
        let is_attachment = part
            .content_disposition()
            .is_some_and(|cd| cd.ctype().eq_ignore_ascii_case("attachment"));
        if is_attachment {
            continue;
        }

        match &part.body {
            PartType::Text(text) => plain.push_str(text),
            PartType::Html(markup) => html.push_str(markup),
            _ => {}
        }
    }

    if !plain.is_empty() {
        plain
    } else {
        strip_html(&html)
    }
}

/// Strip HTML down to its text, preserving line structure so the body
/// cleaner's per-line matching still applies.
pub fn strip_html(html: &str) -> String {
    let html = HTML_INVISIBLE_BLOCKS.replace_all(html, "");
    let html = HTML_LINE_BREAKS.replace_all(&html, "\n");

    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}
