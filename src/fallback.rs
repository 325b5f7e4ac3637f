//! Degraded-path text describer.
//!
//! When the primary provider rejects a submission, the orchestrator makes a
//! single synchronous call to a cheaper text-generation service and, on
//! success, serves the description as a degraded artifact. No retry and no
//! further fallback: if this call fails the generation fails.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::GenerationError;
use crate::provider::map_http_error;

const FALLBACK_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const FALLBACK_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the fallback text-generation endpoint
/// (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Token budget for the description.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Secondary, cheaper generator producing a degraded text artifact.
#[async_trait]
pub trait FallbackDescriber: Send + Sync {
    /// Produce a text description of the scene the clip would have shown.
    /// Single call, own timeout, no retry.
    async fn describe(&self, prompt_text: &str) -> Result<String, GenerationError>;
}

/// HTTP implementation of [`FallbackDescriber`] against an OpenAI-compatible
/// chat completions endpoint.
pub struct HttpFallbackDescriber {
    client: Client,
    config: FallbackConfig,
}

impl HttpFallbackDescriber {
    pub fn new(config: FallbackConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(FALLBACK_HTTP_CONNECT_TIMEOUT)
            .timeout(FALLBACK_HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                GenerationError::Config(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { client, config })
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl FallbackDescriber for HttpFallbackDescriber {
    async fn describe(&self, prompt_text: &str) -> Result<String, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                GenerationError::Config("Fallback API key is not configured".to_string())
            })?;

        let url = format!("{}/chat/completions", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {
                    "role": "system",
                    "content": "Describe the requested video scene in two or three vivid sentences of plain prose.",
                },
                { "role": "user", "content": prompt_text },
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Fallback(format!(
                "Describer rejected with status {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            GenerationError::Fallback(format!("Failed to parse describer response: {}", e))
        })?;

        let text = completion
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                GenerationError::Fallback("Describer returned an empty response".to_string())
            })?;

        Ok(text)
    }
}
