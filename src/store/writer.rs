//! Dual-store writer — commits one extracted email durably and makes it
//! searchable.
//!
//! Ordering is fixed: the relational insert runs first and returns the
//! authoritative id; only then is the vector mirror attempted, keyed by that
//! id. A relational failure stops everything for the message. A vector
//! failure after the relational commit is logged and reported, never rolled
//! back — the accepted best-effort gap of the at-least-once model.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clean::CleanedEmail;
use crate::embedding::embed_text;
use crate::error::StoreError;
use crate::extract::EntityRecord;
use crate::store::traits::{EmailRecord, EmailStore, VectorStore};

/// Bookkeeping attached to every persisted row.
pub const DEFAULT_PROCESSING_STATUS: &str = "processed";
pub const DEFAULT_CONFIDENCE_SCORE: f64 = 1.0;

/// Mailbox/message bookkeeping for one persist call.
#[derive(Debug, Clone)]
pub struct MessageMeta {
    pub mailbox_id: String,
    pub message_id: String,
    pub thread_id: Option<String>,
}

/// Result of one persist call.
#[derive(Debug, Clone)]
pub struct PersistOutcome {
    /// Store-generated id joining the relational row and the vector entry.
    pub email_id: String,
    /// False when the vector mirror write failed after the relational commit.
    pub mirrored: bool,
}

/// Writes one CleanedEmail + EntityRecord pair into both stores.
pub struct DualStoreWriter {
    emails: Arc<dyn EmailStore>,
    vectors: Arc<dyn VectorStore>,
    model_version: String,
}

impl DualStoreWriter {
    pub fn new(
        emails: Arc<dyn EmailStore>,
        vectors: Arc<dyn VectorStore>,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            emails,
            vectors,
            model_version: model_version.into(),
        }
    }

    /// Persist one message: relational commit first, vector mirror second.
    pub async fn persist(
        &self,
        email: &CleanedEmail,
        entities: &EntityRecord,
        meta: &MessageMeta,
    ) -> Result<PersistOutcome, StoreError> {
        let record = EmailRecord {
            mailbox_id: meta.mailbox_id.clone(),
            message_id: meta.message_id.clone(),
            thread_id: meta.thread_id.clone(),
            subject: email.subject.clone(),
            body: email.body.clone(),
            sender: email.sender_display.clone(),
            recipients: email.recipients.clone(),
            received_at: email.date.clone(),
            headers: serde_json::json!({
                "from": email.sender_display,
                "to": email.recipients,
                "date": email.date,
                "verified_sender": email.sender_verified_email,
            }),
            entities: entities.clone(),
            processing_status: DEFAULT_PROCESSING_STATUS.to_string(),
            confidence_score: DEFAULT_CONFIDENCE_SCORE,
            extraction_model_version: self.model_version.clone(),
        };

        // A failure here surfaces to the orchestrator; the vector write is
        // never attempted without a committed row.
        let email_id = self.emails.insert_email(&record).await?;

        let document = email.email_context();
        let vector = embed_text(&document);
        let metadata = vector_metadata(entities);

        let mirrored = match self
            .vectors
            .upsert(&email_id, &document, metadata, vector)
            .await
        {
            Ok(()) => {
                debug!(email_id = %email_id, "Vector mirror written");
                true
            }
            Err(e) => {
                warn!(
                    email_id = %email_id,
                    error = %e,
                    "Vector mirror write failed; relational row retained"
                );
                false
            }
        };

        Ok(PersistOutcome { email_id, mirrored })
    }
}

/// Scalar-only vector metadata: list/structured fields serialized to JSON
/// strings, scalars stringified, absent fields as empty strings.
pub fn vector_metadata(entities: &EntityRecord) -> HashMap<String, String> {
    fn json_list<T: serde::Serialize>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
    }

    let mut metadata = HashMap::new();
    metadata.insert("intent".to_string(), entities.intent.as_str().to_string());
    metadata.insert(
        "customer_organization".to_string(),
        entities.customer_organization.clone(),
    );
    metadata.insert(
        "producer_organization".to_string(),
        entities.producer_organization.clone(),
    );
    metadata.insert("people".to_string(), json_list(&entities.people));
    metadata.insert(
        "date_time".to_string(),
        entities.date_time.clone().unwrap_or_default(),
    );
    metadata.insert("products".to_string(), json_list(&entities.products));
    metadata.insert(
        "monetary_values".to_string(),
        json_list(&entities.monetary_values),
    );
    metadata.insert("addresses".to_string(), json_list(&entities.addresses));
    metadata.insert(
        "phone_numbers".to_string(),
        json_list(&entities.phone_numbers),
    );
    metadata.insert(
        "email_addresses".to_string(),
        json_list(&entities.email_addresses),
    );
    metadata
}
