//! Shared types for the ingestion pipeline.

use serde::Serialize;

use crate::clean::CleanedEmail;

// ── Per-message outcome ─────────────────────────────────────────────

/// Terminal state of one message within a batch.
///
/// State machine per message:
/// `fetched → normalized → cleaned → {extracted | extraction_failed}
/// → {persisted | persist_failed}`.
#[derive(Debug, Clone, Serialize)]
pub enum MessageOutcome {
    /// Relational row committed. `mirrored` is false when the vector write
    /// failed afterwards — the row is retained either way.
    Persisted {
        message_id: String,
        email_id: String,
        mirrored: bool,
    },
    /// Extraction output was malformed, timed out, or the call failed; the
    /// message was dropped from persistence.
    ExtractionFailed { message_id: String, reason: String },
    /// The relational transaction failed and was rolled back.
    PersistFailed { message_id: String, reason: String },
}

impl MessageOutcome {
    pub fn message_id(&self) -> &str {
        match self {
            Self::Persisted { message_id, .. }
            | Self::ExtractionFailed { message_id, .. }
            | Self::PersistFailed { message_id, .. } => message_id,
        }
    }
}

// ── Batch summary ───────────────────────────────────────────────────

/// Aggregate result of one batch run.
///
/// The cleaned messages are returned regardless of downstream success;
/// callers inspect the outcomes to know which messages are fully searchable.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub mailbox_id: String,
    /// Messages returned by the mailbox fetch.
    pub fetched: usize,
    /// One terminal outcome per processed message, in completion order.
    pub outcomes: Vec<MessageOutcome>,
    /// Every cleaned message, including ones that later failed.
    pub cleaned_emails: Vec<CleanedEmail>,
}

impl BatchSummary {
    /// Ids of every email that reached the relational store.
    pub fn saved_emails(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                MessageOutcome::Persisted { email_id, .. } => Some(email_id.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn persisted_count(&self) -> usize {
        self.saved_emails().len()
    }

    pub fn extraction_failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::ExtractionFailed { .. }))
            .count()
    }

    pub fn persist_failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::PersistFailed { .. }))
            .count()
    }

    /// Persisted rows whose vector mirror write failed.
    pub fn unmirrored_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::Persisted { mirrored: false, .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> BatchSummary {
        BatchSummary {
            mailbox_id: "mb-1".into(),
            fetched: 3,
            outcomes: vec![
                MessageOutcome::Persisted {
                    message_id: "m1".into(),
                    email_id: "e1".into(),
                    mirrored: true,
                },
                MessageOutcome::Persisted {
                    message_id: "m2".into(),
                    email_id: "e2".into(),
                    mirrored: false,
                },
                MessageOutcome::ExtractionFailed {
                    message_id: "m3".into(),
                    reason: "malformed".into(),
                },
            ],
            cleaned_emails: Vec::new(),
        }
    }

    #[test]
    fn saved_emails_lists_persisted_ids_only() {
        assert_eq!(summary().saved_emails(), vec!["e1", "e2"]);
    }

    #[test]
    fn counts_partition_outcomes() {
        let summary = summary();
        assert_eq!(summary.persisted_count(), 2);
        assert_eq!(summary.extraction_failed_count(), 1);
        assert_eq!(summary.persist_failed_count(), 0);
        assert_eq!(summary.unmirrored_count(), 1);
    }

    #[test]
    fn message_id_is_exposed_for_every_variant() {
        let summary = summary();
        let ids: Vec<&str> = summary.outcomes.iter().map(|o| o.message_id()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }
}
