//! Batch orchestrator — fetch → normalize → clean → extract → persist.
//!
//! Messages are processed by a fixed-size worker pool; outcomes accumulate
//! in completion order. No stage failure escapes the batch loop: each
//! message ends in a terminal outcome and the rest of the batch continues.
//! Only a failed fetch fails the batch call itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::clean::{CleanedEmail, clean_email};
use crate::config::IngestConfig;
use crate::error::{ExtractionError, PipelineError};
use crate::extract::EntityExtractor;
use crate::mailbox::MailboxClient;
use crate::normalize::{extract_message_ids, normalize_message};
use crate::pipeline::types::{BatchSummary, MessageOutcome};
use crate::store::writer::{DualStoreWriter, MessageMeta};

/// Sequences one batch of messages through the full pipeline.
pub struct IngestPipeline {
    mailbox: Arc<dyn MailboxClient>,
    extractor: Arc<EntityExtractor>,
    writer: Arc<DualStoreWriter>,
    config: IngestConfig,
    cancel: Arc<AtomicBool>,
}

impl IngestPipeline {
    pub fn new(
        mailbox: Arc<dyn MailboxClient>,
        extractor: Arc<EntityExtractor>,
        writer: Arc<DualStoreWriter>,
        config: IngestConfig,
    ) -> Self {
        Self {
            mailbox,
            extractor,
            writer,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cooperative cancellation flag, checked at message granularity.
    /// Setting it stops messages that have not started; in-flight messages
    /// run to their terminal state.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run one batch: fetch recent messages and process each independently.
    ///
    /// Fails only when the fetch itself fails or the batch was cancelled
    /// before any message was processed; per-message failures land in the
    /// summary as terminal outcomes.
    pub async fn run_batch(&self, mailbox_id: &str) -> Result<BatchSummary, PipelineError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(PipelineError::Cancelled);
        }

        let raws = self.mailbox.fetch_recent_raw_messages().await?;
        let fetched = raws.len();
        info!(
            mailbox_id = %mailbox_id,
            fetched,
            provider = %self.mailbox.provider(),
            "Batch started"
        );

        let results: Vec<Option<(CleanedEmail, MessageOutcome)>> = stream::iter(raws)
            .map(|raw| self.process_message(mailbox_id, raw))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        let mut outcomes = Vec::with_capacity(results.len());
        let mut cleaned_emails = Vec::with_capacity(results.len());
        for (cleaned, outcome) in results.into_iter().flatten() {
            cleaned_emails.push(cleaned);
            outcomes.push(outcome);
        }

        let summary = BatchSummary {
            mailbox_id: mailbox_id.to_string(),
            fetched,
            outcomes,
            cleaned_emails,
        };
        info!(
            mailbox_id = %mailbox_id,
            fetched = summary.fetched,
            persisted = summary.persisted_count(),
            extraction_failed = summary.extraction_failed_count(),
            persist_failed = summary.persist_failed_count(),
            unmirrored = summary.unmirrored_count(),
            "Batch finished"
        );
        Ok(summary)
    }

    /// Run one message to its terminal state. Returns `None` only when the
    /// batch was cancelled before this message started.
    async fn process_message(
        &self,
        mailbox_id: &str,
        raw: Vec<u8>,
    ) -> Option<(CleanedEmail, MessageOutcome)> {
        if self.cancel.load(Ordering::Relaxed) {
            debug!("Batch cancelled; skipping remaining message");
            return None;
        }

        let (message_id, thread_id) = extract_message_ids(&raw);
        let normalized = normalize_message(&raw);
        let cleaned = clean_email(normalized);
        debug!(message_id = %message_id, subject = %cleaned.subject, "Message cleaned");

        let context = cleaned.email_context();
        let entities = match tokio::time::timeout(
            self.config.extract_timeout,
            self.extractor.extract(&context),
        )
        .await
        {
            Ok(Ok(entities)) => entities,
            Ok(Err(e)) => {
                warn!(message_id = %message_id, error = %e, "Extraction failed; message dropped");
                return Some((
                    cleaned,
                    MessageOutcome::ExtractionFailed {
                        message_id,
                        reason: e.to_string(),
                    },
                ));
            }
            Err(_) => {
                let e = ExtractionError::Timeout {
                    timeout: self.config.extract_timeout,
                };
                warn!(message_id = %message_id, error = %e, "Extraction failed; message dropped");
                return Some((
                    cleaned,
                    MessageOutcome::ExtractionFailed {
                        message_id,
                        reason: e.to_string(),
                    },
                ));
            }
        };

        let meta = MessageMeta {
            mailbox_id: mailbox_id.to_string(),
            message_id: message_id.clone(),
            thread_id,
        };
        match tokio::time::timeout(
            self.config.persist_timeout,
            self.writer.persist(&cleaned, &entities, &meta),
        )
        .await
        {
            Ok(Ok(outcome)) => {
                debug!(message_id = %message_id, email_id = %outcome.email_id, "Message persisted");
                Some((
                    cleaned,
                    MessageOutcome::Persisted {
                        message_id,
                        email_id: outcome.email_id,
                        mirrored: outcome.mirrored,
                    },
                ))
            }
            Ok(Err(e)) => {
                warn!(message_id = %message_id, error = %e, "Persist failed");
                Some((
                    cleaned,
                    MessageOutcome::PersistFailed {
                        message_id,
                        reason: e.to_string(),
                    },
                ))
            }
            Err(_) => {
                warn!(
                    message_id = %message_id,
                    timeout = ?self.config.persist_timeout,
                    "Persist timed out"
                );
                Some((
                    cleaned,
                    MessageOutcome::PersistFailed {
                        message_id,
                        reason: format!("timed out after {:?}", self.config.persist_timeout),
                    },
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::{ExtractionError, MailboxError};
    use crate::extract::ExtractionProvider;
    use crate::mailbox::Provider;
    use crate::store::libsql_backend::LibSqlStore;
    use crate::store::vector::InMemoryVectorStore;
    use crate::store::traits::{EmailStore, VectorStore};

    /// Mailbox fake returning a fixed set of raw messages.
    struct StaticMailbox {
        raws: Vec<Vec<u8>>,
    }

    #[async_trait]
    impl MailboxClient for StaticMailbox {
        fn provider(&self) -> Provider {
            Provider::Gmail
        }

        async fn fetch_recent_raw_messages(&self) -> Result<Vec<Vec<u8>>, MailboxError> {
            Ok(self.raws.clone())
        }
    }

    /// Mailbox fake whose fetch always fails.
    struct BrokenMailbox;

    #[async_trait]
    impl MailboxClient for BrokenMailbox {
        fn provider(&self) -> Provider {
            Provider::Gmail
        }

        async fn fetch_recent_raw_messages(&self) -> Result<Vec<Vec<u8>>, MailboxError> {
            Err(MailboxError::RequestFailed {
                provider: "gmail".into(),
                reason: "connection refused".into(),
            })
        }
    }

    /// Provider fake: valid structured output unless the input mentions
    /// "gibberish", in which case it returns prose the adapter rejects.
    struct ScriptedProvider;

    #[async_trait]
    impl ExtractionProvider for ScriptedProvider {
        fn model_name(&self) -> &str {
            "test-model"
        }

        async fn complete(
            &self,
            _system_prompt: &str,
            input: &str,
            _schema: &serde_json::Value,
        ) -> Result<String, ExtractionError> {
            if input.contains("gibberish") {
                return Ok("Sorry, I could not make sense of this email.".to_string());
            }
            Ok(r#"{
                "intent": "place_order",
                "customer_organization": "Acme Corp",
                "producer_organization": "Widget Works",
                "people": ["Alice Smith"],
                "date_time": null,
                "products": [{"product_name": "Widget", "model": null, "quantity": 40.0}],
                "monetary_values": [],
                "addresses": [],
                "phone_number": null,
                "email_addresses": []
            }"#
            .to_string())
        }
    }

    fn raw_message(message_id: &str, body: &str) -> Vec<u8> {
        format!(
            "From: Alice <alice@acme.test>\r\n\
To: sales@widgetworks.test\r\n\
Subject: Order\r\n\
Message-ID: <{message_id}>\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
{body}\r\n"
        )
        .into_bytes()
    }

    async fn pipeline_with(
        raws: Vec<Vec<u8>>,
    ) -> (IngestPipeline, Arc<LibSqlStore>, Arc<InMemoryVectorStore>) {
        let emails = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let vectors = Arc::new(InMemoryVectorStore::default());
        let writer = Arc::new(DualStoreWriter::new(
            Arc::clone(&emails) as Arc<dyn EmailStore>,
            Arc::clone(&vectors) as Arc<dyn VectorStore>,
            "test-model",
        ));
        let extractor = Arc::new(EntityExtractor::new(Arc::new(ScriptedProvider)));
        let pipeline = IngestPipeline::new(
            Arc::new(StaticMailbox { raws }),
            extractor,
            writer,
            IngestConfig::default(),
        );
        (pipeline, emails, vectors)
    }

    #[tokio::test]
    async fn extraction_failure_does_not_halt_batch() {
        let (pipeline, emails, vectors) = pipeline_with(vec![
            raw_message("m1@acme.test", "Please ship 40 widgets."),
            raw_message("m2@acme.test", "utter gibberish follows"),
            raw_message("m3@acme.test", "Another 40 widgets please."),
        ])
        .await;

        let summary = pipeline.run_batch("mb-1").await.unwrap();
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.persisted_count(), 2);
        assert_eq!(summary.extraction_failed_count(), 1);
        assert_eq!(summary.cleaned_emails.len(), 3);

        assert_eq!(emails.list_recent(10).await.unwrap().len(), 2);
        assert_eq!(vectors.stats().await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn failed_extraction_is_tied_to_its_message_id() {
        let (pipeline, _, _) = pipeline_with(vec![
            raw_message("good@acme.test", "Please ship 40 widgets."),
            raw_message("bad@acme.test", "utter gibberish follows"),
        ])
        .await;

        let summary = pipeline.run_batch("mb-1").await.unwrap();
        let failed: Vec<&str> = summary
            .outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::ExtractionFailed { .. }))
            .map(|o| o.message_id())
            .collect();
        assert_eq!(failed, vec!["bad@acme.test"]);
    }

    #[tokio::test]
    async fn empty_mailbox_yields_empty_summary() {
        let (pipeline, _, _) = pipeline_with(Vec::new()).await;
        let summary = pipeline.run_batch("mb-1").await.unwrap();
        assert_eq!(summary.fetched, 0);
        assert!(summary.outcomes.is_empty());
        assert!(summary.cleaned_emails.is_empty());
    }

    #[tokio::test]
    async fn cancelled_batch_fails_before_fetch() {
        let (pipeline, _, _) = pipeline_with(vec![raw_message("m1@acme.test", "body")]).await;
        pipeline.cancel_flag().store(true, Ordering::Relaxed);
        let err = pipeline.run_batch("mb-1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[tokio::test]
    async fn fetch_failure_fails_the_batch_call() {
        let emails = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let vectors = Arc::new(InMemoryVectorStore::default());
        let writer = Arc::new(DualStoreWriter::new(
            emails as Arc<dyn EmailStore>,
            vectors as Arc<dyn VectorStore>,
            "test-model",
        ));
        let pipeline = IngestPipeline::new(
            Arc::new(BrokenMailbox),
            Arc::new(EntityExtractor::new(Arc::new(ScriptedProvider))),
            writer,
            IngestConfig::default(),
        );
        let err = pipeline.run_batch("mb-1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }
}
