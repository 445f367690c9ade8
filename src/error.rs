//! Error types for ordersift.

use std::time::Duration;

/// Top-level error type for the ingestion core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mailbox client errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Unsupported email provider: {0}")]
    UnsupportedProvider(String),

    #[error("Mailbox request failed for provider {provider}: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned an API error (status {status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode raw message payload: {0}")]
    Decode(String),
}

/// Entity extraction errors.
///
/// `Malformed` is the definitive signal that the extraction output failed
/// JSON/schema validation — the message is dropped from persistence and the
/// batch continues.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction request failed: {0}")]
    Request(String),

    #[error("Extraction provider returned an API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed extraction output: {0}")]
    Malformed(String),

    #[error("Extraction timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Relational store errors. A failed insert is rolled back by the store and
/// surfaced here; the vector mirror is never attempted after one.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Vector store operation failed: {0}")]
    Vector(String),
}

/// Search-related errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

/// Pipeline orchestration errors. Only the batch-level fetch can fail the
/// batch call; per-message failures are folded into the batch summary.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] MailboxError),

    #[error("Batch cancelled before any message was processed")]
    Cancelled,
}

/// Result type alias for the ingestion core.
pub type Result<T> = std::result::Result<T, Error>;
