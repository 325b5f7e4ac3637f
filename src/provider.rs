//! Primary generation provider abstraction.
//!
//! The provider renders short video clips as long-running operations: one
//! request starts an operation and yields an opaque handle, after which the
//! orchestrator observes progress only by polling that handle. Transport,
//! auth header, and endpoint shape live here; the orchestration core depends
//! only on the [`VideoProvider`] trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::GenerationError;

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the primary video provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoProviderConfig {
    /// Base URL of the generation service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer credential. Missing credentials surface as
    /// [`GenerationError::Config`] at call time.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier passed with each submission.
    #[serde(default = "default_model")]
    pub model: String,

    /// Default output resolution, overridable per request.
    #[serde(default = "default_resolution")]
    pub resolution: String,
}

fn default_base_url() -> String {
    "https://api.example-video.dev/v1".to_string()
}

fn default_model() -> String {
    "clip-video-1".to_string()
}

fn default_resolution() -> String {
    "720p".to_string()
}

impl Default for VideoProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            resolution: default_resolution(),
        }
    }
}

/// What the orchestrator sends when starting an operation.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub prompt_text: String,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
}

/// Opaque identifier for a long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle(pub String);

impl OperationHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One poll observation of a long-running operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollStatus {
    /// Whether the operation reached a terminal state.
    pub done: bool,
    /// Locator of the rendered clip, present on successful completion.
    pub result_locator: Option<String>,
    /// Provider error payload, present on failed completion.
    pub error: Option<String>,
    /// Optional provider-reported progress percentage. Advisory only.
    pub progress_hint: Option<u8>,
}

/// Client for the primary generation provider.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Start a long-running generation operation. One shot: submission
    /// failures are terminal for this step and are never retried here.
    async fn start(&self, request: &SubmitRequest) -> Result<OperationHandle, GenerationError>;

    /// Observe the operation identified by `handle`.
    async fn poll(&self, handle: &OperationHandle) -> Result<PollStatus, GenerationError>;

    fn provider_name(&self) -> &str;
}

pub(crate) fn build_provider_http_client() -> Result<Client, GenerationError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| GenerationError::Config(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn map_http_error(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() || error.is_connect() {
        GenerationError::Transport(format!("Connection error: {}", error))
    } else if error.is_status() {
        let status = error
            .status()
            .map(|s| s.as_u16().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        GenerationError::Upstream(format!("Request failed with status {}: {}", status, error))
    } else {
        GenerationError::Transport(format!("HTTP error: {}", error))
    }
}

/// HTTP implementation of [`VideoProvider`].
pub struct HttpVideoProvider {
    client: Client,
    config: VideoProviderConfig,
}

impl HttpVideoProvider {
    pub fn new(config: VideoProviderConfig) -> Result<Self, GenerationError> {
        let client = build_provider_http_client()?;
        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                GenerationError::Config("Video provider API key is not configured".to_string())
            })
    }
}

#[derive(Deserialize)]
struct StartOperationResponse {
    operation_id: String,
}

#[derive(Deserialize)]
struct PollOperationResponse {
    done: bool,
    #[serde(default)]
    result_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    progress: Option<u8>,
}

#[async_trait]
impl VideoProvider for HttpVideoProvider {
    async fn start(&self, request: &SubmitRequest) -> Result<OperationHandle, GenerationError> {
        let api_key = self.api_key()?;
        let url = format!("{}/operations", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "prompt": request.prompt_text,
            "aspect_ratio": request.aspect_ratio.as_deref().unwrap_or("16:9"),
            "resolution": request
                .resolution
                .as_deref()
                .unwrap_or(self.config.resolution.as_str()),
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
            return Err(GenerationError::Upstream(format!(
                "Submission rejected with status {}: {}",
                status, error_text
            )));
        }

        let started: StartOperationResponse = response.json().await.map_err(|e| {
            GenerationError::Upstream(format!("Failed to parse submission response: {}", e))
        })?;

        Ok(OperationHandle(started.operation_id))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<PollStatus, GenerationError> {
        let api_key = self.api_key()?;
        let url = format!("{}/operations/{}", self.config.base_url, handle.as_str());

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Upstream(format!(
                "Poll rejected with status {}: {}",
                status, error_text
            )));
        }

        let polled: PollOperationResponse = response.json().await.map_err(|e| {
            GenerationError::Transport(format!("Failed to parse poll response: {}", e))
        })?;

        Ok(PollStatus {
            done: polled.done,
            result_locator: polled.result_url,
            error: polled.error,
            progress_hint: polled.progress,
        })
    }

    fn provider_name(&self) -> &str {
        "http-video"
    }
}
