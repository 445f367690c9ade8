//! Ingestion pipeline.
//!
//! One batch flows through:
//! 1. `MailboxClient::fetch_recent_raw_messages()` — provider I/O
//! 2. `normalize_message()` — RFC822 → decoded headers + plain-text body
//! 3. `clean_email()` — quote/signature/boilerplate stripping
//! 4. `EntityExtractor::extract()` — LLM entity extraction
//! 5. `DualStoreWriter::persist()` — relational commit, then vector mirror
//!
//! Messages are independent: a terminal failure in one never halts the rest
//! of the batch.

pub mod orchestrator;
pub mod types;

pub use orchestrator::IngestPipeline;
pub use types::{BatchSummary, MessageOutcome};
