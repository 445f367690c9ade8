//! Extraction adapter — turns email context text into an `EntityRecord` or a
//! definitive failure signal. A result, never an escaping panic; no internal
//! retries (retry policy, if any, belongs to the orchestrator).

use std::sync::{Arc, LazyLock};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ExtractionError;
use crate::extract::ExtractionProvider;
use crate::extract::entities::{EntityRecord, SalesOrderWire, extraction_schema};

const SYSTEM_PROMPT: &str = "\
You extract structured sales-order information from emails between customers \
and producers. Read the email below and fill every field of the response \
schema. Use the sender's organization as customer_organization and the \
receiving organization as producer_organization. List people, products \
(with model and quantity when stated), monetary values, addresses, the \
contact phone number and contact email addresses exactly as written. \
date_time is the last delivery date mentioned, or null. Do not invent \
values; leave fields empty or null when the email does not mention them.";

static SCHEMA: LazyLock<serde_json::Value> = LazyLock::new(extraction_schema);

/// Date-only formats tried in order by the permissive parser.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Adapter over an [`ExtractionProvider`] that validates and normalizes the
/// model output into the canonical record.
pub struct EntityExtractor {
    provider: Arc<dyn ExtractionProvider>,
}

impl EntityExtractor {
    pub fn new(provider: Arc<dyn ExtractionProvider>) -> Self {
        Self { provider }
    }

    /// Model identifier for bookkeeping columns.
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Extract entities from one email context.
    ///
    /// Malformed output (JSON parse failure, schema violation, unparseable
    /// `date_time`) yields [`ExtractionError::Malformed`]; the caller skips
    /// persistence for this message and continues the batch.
    pub async fn extract(&self, text: &str) -> Result<EntityRecord, ExtractionError> {
        let raw = self.provider.complete(SYSTEM_PROMPT, text, &SCHEMA).await?;

        let wire: SalesOrderWire = serde_json::from_str(&raw)
            .map_err(|e| ExtractionError::Malformed(format!("output failed the contract: {e}")))?;

        let date_time = match wire.date_time.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw_date) => Some(normalize_date(raw_date).ok_or_else(|| {
                ExtractionError::Malformed(format!("unparseable date_time '{raw_date}'"))
            })?),
            None => None,
        };

        Ok(EntityRecord {
            intent: wire.intent,
            customer_organization: wire.customer_organization,
            producer_organization: wire.producer_organization,
            people: wire.people,
            date_time,
            products: wire.products,
            monetary_values: wire.monetary_values,
            addresses: wire.addresses,
            // The contract yields at most one phone number.
            phone_numbers: wire.phone_number.into_iter().collect(),
            email_addresses: wire.email_addresses,
        })
    }
}

/// Permissive date parsing: formats tried in order, normalized to `YYYY-MM-DD`.
pub fn normalize_date(input: &str) -> Option<String> {
    let input = input.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(input) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(input) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt.format("%Y-%m-%d").to_string());
        }
    }
    None
}
