//! Configuration types, built from environment variables.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::mailbox::Provider;

/// Default worker count for message-level parallelism within a batch.
const DEFAULT_CONCURRENCY: usize = 4;

/// Default per-stage timeout for the extraction call.
const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 60;

/// Default per-stage timeout covering both store writes for one message.
const DEFAULT_PERSIST_TIMEOUT_SECS: u64 = 30;

/// Ingestion pipeline configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Mailbox provider to ingest from.
    pub provider: Provider,
    /// How many messages are processed concurrently within one batch.
    pub concurrency: usize,
    /// Timeout imposed on a single extraction call.
    pub extract_timeout: Duration,
    /// Timeout imposed on persisting a single message (both stores).
    pub persist_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gmail,
            concurrency: DEFAULT_CONCURRENCY,
            extract_timeout: Duration::from_secs(DEFAULT_EXTRACT_TIMEOUT_SECS),
            persist_timeout: Duration::from_secs(DEFAULT_PERSIST_TIMEOUT_SECS),
        }
    }
}

impl IngestConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match std::env::var("ORDERSIFT_PROVIDER") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "ORDERSIFT_PROVIDER".into(),
                    message: format!("unknown provider '{raw}'"),
                })?,
            Err(_) => Provider::Gmail,
        };

        let concurrency: usize = std::env::var("ORDERSIFT_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONCURRENCY)
            .max(1);

        let extract_timeout = Duration::from_secs(
            std::env::var("ORDERSIFT_EXTRACT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_EXTRACT_TIMEOUT_SECS),
        );

        let persist_timeout = Duration::from_secs(
            std::env::var("ORDERSIFT_PERSIST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PERSIST_TIMEOUT_SECS),
        );

        Ok(Self {
            provider,
            concurrency,
            extract_timeout,
            persist_timeout,
        })
    }
}

/// Extraction provider configuration.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub api_key: SecretString,
    pub model: String,
}

impl ExtractionConfig {
    /// Build from `OPENAI_API_KEY` and `ORDERSIFT_MODEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".into()))?;

        let model =
            std::env::var("ORDERSIFT_MODEL").unwrap_or_else(|_| "gpt-4.1".to_string());

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
        })
    }
}
