//! Mailbox clients — provider capability interface, selected at
//! configuration time. Unimplemented providers fail fast with an explicit
//! unsupported-provider error rather than returning empty silently.

mod gmail;

pub use gmail::GmailClient;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{ConfigError, MailboxError};

/// Known mailbox providers. Only Gmail is implemented today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gmail,
    Outlook,
    Yahoo,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Outlook => "outlook",
            Self::Yahoo => "yahoo",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = MailboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gmail" => Ok(Self::Gmail),
            "outlook" => Ok(Self::Outlook),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(MailboxError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Connection settings shared by provider clients. The OAuth token exchange
/// is external; clients receive a ready access token.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    pub access_token: SecretString,
    /// Fetch window: messages received within this duration are returned.
    pub lookback: Duration,
    /// Upper bound on messages fetched per batch.
    pub max_results: u32,
}

impl MailboxConfig {
    /// Build from `MAILBOX_ACCESS_TOKEN` plus optional window/limit overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token = std::env::var("MAILBOX_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("MAILBOX_ACCESS_TOKEN".into()))?;

        let lookback_secs: u64 = std::env::var("ORDERSIFT_LOOKBACK_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        let max_results: u32 = std::env::var("ORDERSIFT_MAX_RESULTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            access_token: SecretString::from(access_token),
            lookback: Duration::from_secs(lookback_secs),
            max_results,
        })
    }
}

/// Mailbox capability: fetch recent messages as raw RFC822 bytes.
/// The time window and provider API details are owned by the client.
#[async_trait]
pub trait MailboxClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Zero or more raw RFC822 messages, newest window owned by the client.
    async fn fetch_recent_raw_messages(&self) -> Result<Vec<Vec<u8>>, MailboxError>;
}

/// Select a client for the configured provider. Fails fast on providers
/// without an implementation.
pub fn create_client(
    provider: Provider,
    config: MailboxConfig,
) -> Result<Arc<dyn MailboxClient>, MailboxError> {
    match provider {
        Provider::Gmail => Ok(Arc::new(GmailClient::new(config))),
        other => Err(MailboxError::UnsupportedProvider(other.to_string())),
    }
}
