//! Body cleaner — strips quoted replies, signatures, and boilerplate from a
//! normalized email body. Pure text transforms, no side effects.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedEmail;

/// Per-line quote/boilerplate patterns. A line matching any of these is
/// blanked; matching is per-line and independent of surrounding lines.
static QUOTE_LINE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^-----\s*original message\s*-----",
        r"(?i)^from:\s+",
        r"(?i)^sent:\s+",
        r"(?i)^to:\s+",
        r"(?i)^subject:\s+",
        r"(?i)^on\s+.*wrote:$",
        r"^\s*>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("quote pattern must compile"))
    .collect()
});

/// Inline-image content ids, raw image tags, bare URLs, bracketed image
/// placeholders.
static EMBEDDED_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cid:\S+|<img[^>]*>|http\S+|\[image:.*?\]").unwrap());

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

static MULTI_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Signature delimiters, scanned in this priority order; the earliest
/// occurrence in the text wins. Truncation is destructive: a mid-message
/// "Thanks," cuts the body there (known tradeoff).
const SIGNATURE_TOKENS: &[&str] = &["-- ", "Regards,", "Best regards,", "Thanks,", "Sincerely,"];

/// A normalized email whose body has been cleaned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedEmail {
    pub subject: String,
    pub sender_display: String,
    pub sender_verified_email: Option<String>,
    pub recipients: Vec<String>,
    pub date: String,
    pub body: String,
}

impl CleanedEmail {
    /// The unit of text fed to entity extraction: subject, newline, body.
    /// Derived on demand, never stored.
    pub fn email_context(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
    }
}

/// Clean a normalized email, replacing its body with the cleaned form.
pub fn clean_email(email: NormalizedEmail) -> CleanedEmail {
    CleanedEmail {
        body: clean_body(&email.body),
        subject: email.subject,
        sender_display: email.sender_display,
        sender_verified_email: email.sender_verified_email,
        recipients: email.recipients,
        date: email.date,
    }
}

/// Clean body text while preserving original formatting and letter case.
pub fn clean_body(body: &str) -> String {
    if body.is_empty() {
        return String::new();
    }

    // Literal backslash-n sequences become real line breaks; CRLF becomes LF.
    let body = body.replace("\\n", "\n").replace("\r\n", "\n");

    // Blank quoted-reply and forwarded-message lines.
    let body = body
        .lines()
        .map(|line| {
            if QUOTE_LINE_PATTERNS.iter().any(|p| p.is_match(line)) {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    // Truncate at the earliest signature delimiter found in the text.
    let body = match SIGNATURE_TOKENS
        .iter()
        .filter_map(|token| body.find(token))
        .min()
    {
        Some(pos) => &body[..pos],
        None => &body[..],
    };

    let body = EMBEDDED_CONTENT.replace_all(body, "");

    // Collapse runs of identical adjacent lines to a single occurrence.
    let mut unique_lines: Vec<&str> = Vec::new();
    for line in body.lines() {
        if unique_lines.last() != Some(&line) {
            unique_lines.push(line);
        }
    }
    let body = unique_lines.join("\n");

    let body = MULTI_SPACE.replace_all(&body, " ");
    let body = MULTI_NEWLINE.replace_all(&body, "\n\n");

    body.trim().to_string()
}
