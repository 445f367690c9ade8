//! OpenAI-backed extraction provider — one structured-output chat completion
//! per call over the REST API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::extract::ExtractionProvider;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sampling settings carried over from the extraction contract.
const TEMPERATURE: f64 = 0.67;
const MAX_OUTPUT_TOKENS: u32 = 2048;

/// OpenAI chat-completions client for schema-constrained extraction.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: config.model.clone(),
        }
    }

    /// Set a custom base URL (proxies, compatible endpoints, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl ExtractionProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        input: &str,
        schema: &serde_json::Value,
    ) -> Result<String, ExtractionError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": input },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "sales_order_email",
                    "strict": true,
                    "schema": schema,
                },
            },
            "temperature": TEMPERATURE,
            "max_tokens": MAX_OUTPUT_TOKENS,
        });

        let start = std::time::Instant::now();

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Extraction request failed");
                ExtractionError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Extraction API error");
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "Extraction completion"
        );

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractionError::Malformed("completion response had no choices".into()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}
