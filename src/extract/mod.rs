//! Entity extraction — structured-extraction capability behind a provider
//! trait, plus the adapter that normalizes model output into a canonical
//! `EntityRecord`.

mod adapter;
mod entities;
mod openai;

pub use adapter::{EntityExtractor, normalize_date};
pub use entities::{EntityRecord, Intent, Product, extraction_schema};
pub use openai::OpenAiProvider;

use async_trait::async_trait;

use crate::error::ExtractionError;

/// The external structured-extraction capability.
///
/// Implementations take the system prompt, the input text, and the fixed
/// schema contract, and return the raw model output. They perform no retries
/// and no response validation — that is the adapter's job.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Model identifier, recorded as `extraction_model_version` on persisted rows.
    fn model_name(&self) -> &str;

    /// Run one completion against the schema contract, returning raw output text.
    async fn complete(
        &self,
        system_prompt: &str,
        input: &str,
        schema: &serde_json::Value,
    ) -> Result<String, ExtractionError>;
}
