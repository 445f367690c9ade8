//! Gmail client over the Gmail REST API.
//!
//! Fetches message ids matching an inbox/time-window query, then each
//! message in `raw` format (base64url-encoded RFC822 bytes). A failed
//! individual message fetch is logged and skipped; only the listing call can
//! fail the fetch as a whole.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::MailboxError;
use crate::mailbox::{MailboxClient, MailboxConfig, Provider};

const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Gmail REST client. Receives a ready OAuth access token; the token
/// exchange happens outside this crate.
pub struct GmailClient {
    http: reqwest::Client,
    config: MailboxConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    raw: String,
}

impl GmailClient {
    pub fn new(config: MailboxConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.access_token.expose_secret())
    }

    /// Inbox query for the configured lookback window.
    fn window_query(&self) -> String {
        let after = (Utc::now() - self.config.lookback).timestamp();
        format!("in:inbox after:{after}")
    }

    async fn list_message_ids(&self) -> Result<Vec<String>, MailboxError> {
        let response = self
            .http
            .get(format!("{}/users/me/messages", self.base_url))
            .header("Authorization", self.bearer())
            .query(&[
                ("q", self.window_query()),
                ("maxResults", self.config.max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| MailboxError::RequestFailed {
                provider: Provider::Gmail.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailboxError::Api {
                provider: Provider::Gmail.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let list: MessageList = response.json().await.map_err(|e| MailboxError::RequestFailed {
            provider: Provider::Gmail.to_string(),
            reason: format!("bad message list response: {e}"),
        })?;

        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_raw(&self, id: &str) -> Result<Vec<u8>, MailboxError> {
        let response = self
            .http
            .get(format!("{}/users/me/messages/{id}", self.base_url))
            .header("Authorization", self.bearer())
            .query(&[("format", "raw")])
            .send()
            .await
            .map_err(|e| MailboxError::RequestFailed {
                provider: Provider::Gmail.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailboxError::Api {
                provider: Provider::Gmail.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let message: RawMessage = response.json().await.map_err(|e| MailboxError::RequestFailed {
            provider: Provider::Gmail.to_string(),
            reason: format!("bad raw message response: {e}"),
        })?;

        decode_raw(&message.raw)
    }
}

/// Decode the base64url payload of a `format=raw` message.
fn decode_raw(raw: &str) -> Result<Vec<u8>, MailboxError> {
    URL_SAFE_NO_PAD
        .decode(raw.trim_end_matches('='))
        .map_err(|e| MailboxError::Decode(e.to_string()))
}

#[async_trait]
impl MailboxClient for GmailClient {
    fn provider(&self) -> Provider {
        Provider::Gmail
    }

    async fn fetch_recent_raw_messages(&self) -> Result<Vec<Vec<u8>>, MailboxError> {
        let ids = self.list_message_ids().await?;
        debug!(count = ids.len(), "Gmail messages in window");

        let mut raws = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.fetch_raw(id).await {
                Ok(bytes) => raws.push(bytes),
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping unfetchable message");
                }
            }
        }
        Ok(raws)
    }
}
