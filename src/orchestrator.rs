//! Generation orchestration.
//!
//! Submits a generation request to the primary provider, owns a per-request
//! background poll loop, transitions the status record through its lifecycle,
//! and invokes the fallback describer when submission fails. The orchestrator
//! never consults the artifact cache: callers check the cache before calling
//! [`GenerationOrchestrator::generate`] and write completed artifacts back
//! themselves (cache-aside).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::fallback::FallbackDescriber;
use crate::provider::{OperationHandle, SubmitRequest, VideoProvider};
use crate::registry::{GenerationRecord, GenerationStatus, StatusRegistry};
use crate::types::{ArtifactData, GenerationId};

/// Message recorded when the poll attempt budget is exhausted.
const TIMED_OUT_MESSAGE: &str = "timed out";

/// Poll loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Fixed delay between poll attempts.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Attempt budget; `max_attempts * poll_interval` is the hard client-side
    /// ceiling on a generation, independent of the provider.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Consecutive poll-transport failures tolerated before declaring the
    /// operation broken.
    #[serde(default = "default_max_transport_failures")]
    pub max_transport_failures: u32,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    60
}

fn default_max_transport_failures() -> u32 {
    3
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            max_transport_failures: default_max_transport_failures(),
        }
    }
}

/// Caller-supplied generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub subject_id: String,
    pub artifact_type: String,
    pub prompt_text: String,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
}

impl GenerationRequest {
    fn validate(&self) -> Result<(), GenerationError> {
        if self.subject_id.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "subject_id must be non-empty".to_string(),
            ));
        }
        if self.artifact_type.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "artifact_type must be non-empty".to_string(),
            ));
        }
        if self.prompt_text.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "prompt_text must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// What `generate` hands back: the id to poll plus a snapshot of the record,
/// already terminal when the fallback path resolved synchronously.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub generation_id: GenerationId,
    pub record: GenerationRecord,
}

/// Orchestrates generations against an injected provider pair and a shared
/// status registry.
pub struct GenerationOrchestrator {
    provider: Arc<dyn VideoProvider>,
    fallback: Arc<dyn FallbackDescriber>,
    registry: Arc<StatusRegistry>,
    polling: PollingConfig,
}

impl GenerationOrchestrator {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        fallback: Arc<dyn FallbackDescriber>,
        registry: Arc<StatusRegistry>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            provider,
            fallback,
            registry,
            polling,
        }
    }

    pub fn registry(&self) -> &Arc<StatusRegistry> {
        &self.registry
    }

    /// Start a generation.
    ///
    /// Creates a pending record, submits once to the primary provider, and
    /// either spawns the background poll loop (submission accepted) or runs
    /// the degraded fallback path synchronously (submission rejected). No
    /// submission retry.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationTicket, GenerationError> {
        request.validate()?;

        let generation_id = GenerationId::next();
        let (_, cancel) = self.registry.insert_pending(generation_id.clone());

        debug!(
            generation_id = %generation_id,
            subject_id = %request.subject_id,
            artifact_type = %request.artifact_type,
            provider = self.provider.provider_name(),
            "submitting generation"
        );

        let submit = SubmitRequest {
            prompt_text: request.prompt_text.clone(),
            aspect_ratio: request.aspect_ratio.clone(),
            resolution: request.resolution.clone(),
        };

        match self.provider.start(&submit).await {
            Ok(handle) => {
                self.registry.update(&generation_id, |record| {
                    record.status = GenerationStatus::Processing;
                    record.operation_handle = Some(handle.clone());
                    record.progress_percent = 10;
                });
                self.spawn_poll_loop(generation_id.clone(), handle, cancel);
            }
            Err(submit_err) => {
                self.run_fallback(&generation_id, &request.prompt_text, submit_err)
                    .await;
            }
        }

        let record = self
            .registry
            .snapshot(&generation_id)
            .ok_or_else(|| GenerationError::NotFound(generation_id.to_string()))?;
        Ok(GenerationTicket {
            generation_id,
            record,
        })
    }

    /// Point-in-time snapshot for progress rendering.
    pub fn get_status(&self, generation_id: &GenerationId) -> Option<GenerationRecord> {
        self.registry.snapshot(generation_id)
    }

    /// Stop the poll loop of a live generation. The record becomes failed
    /// with a cancellation message. Returns whether anything was signalled;
    /// terminal and unknown ids are a no-op.
    pub fn cancel(&self, generation_id: &GenerationId) -> bool {
        match self.registry.cancel_handle(generation_id) {
            Some(handle) => {
                handle.notify_one();
                true
            }
            None => false,
        }
    }

    /// Remove all terminal records. Caller-invoked sweep, never automatic.
    pub fn clear_terminal(&self) -> usize {
        self.registry.clear_terminal()
    }

    /// Degraded path: single synchronous describer call. On success the
    /// generation completes with an inline text artifact tagged degraded; on
    /// failure the record fails carrying the original submission error.
    async fn run_fallback(
        &self,
        generation_id: &GenerationId,
        prompt_text: &str,
        submit_err: GenerationError,
    ) {
        warn!(
            generation_id = %generation_id,
            error = %submit_err,
            "submission failed, attempting degraded fallback"
        );

        match self.fallback.describe(prompt_text).await {
            Ok(text) => {
                self.registry.update(generation_id, |record| {
                    record.status = GenerationStatus::Completed;
                    record.degraded = true;
                    record.result = Some(ArtifactData::Inline(text.clone()));
                    record.progress_percent = 100;
                });
                info!(generation_id = %generation_id, "fallback produced degraded artifact");
            }
            Err(fallback_err) => {
                warn!(
                    generation_id = %generation_id,
                    error = %fallback_err,
                    "fallback failed, generation is lost"
                );
                self.registry.update(generation_id, |record| {
                    record.status = GenerationStatus::Failed;
                    record.error_message = Some(submit_err.to_string());
                });
            }
        }
    }

    fn spawn_poll_loop(
        &self,
        generation_id: GenerationId,
        handle: OperationHandle,
        cancel: Arc<Notify>,
    ) {
        let provider = Arc::clone(&self.provider);
        let registry = Arc::clone(&self.registry);
        let polling = self.polling.clone();
        tokio::spawn(async move {
            poll_loop(provider, registry, polling, generation_id, handle, cancel).await;
        });
    }
}

/// Background poll loop for one generation. Errors never escape: every exit
/// path only updates the record. Polls are strictly sequential; a new poll is
/// issued only after the previous response was processed.
async fn poll_loop(
    provider: Arc<dyn VideoProvider>,
    registry: Arc<StatusRegistry>,
    polling: PollingConfig,
    generation_id: GenerationId,
    handle: OperationHandle,
    cancel: Arc<Notify>,
) {
    let interval = Duration::from_millis(polling.poll_interval_ms);
    let mut consecutive_transport_failures = 0u32;

    for attempt in 1..=polling.max_attempts {
        tokio::select! {
            _ = cancel.notified() => {
                registry.update(&generation_id, |record| {
                    record.status = GenerationStatus::Failed;
                    record.error_message = Some("generation cancelled by caller".to_string());
                });
                info!(generation_id = %generation_id, attempt, "generation cancelled");
                return;
            }
            _ = sleep(interval) => {}
        }

        match provider.poll(&handle).await {
            Ok(status) if status.done => {
                if let Some(locator) = status.result_locator {
                    registry.update(&generation_id, |record| {
                        record.status = GenerationStatus::Completed;
                        record.result = Some(ArtifactData::Locator(locator.clone()));
                        record.progress_percent = 100;
                    });
                    info!(generation_id = %generation_id, attempt, "generation completed");
                } else {
                    let message = status
                        .error
                        .unwrap_or_else(|| "provider reported completion without a result".to_string());
                    registry.update(&generation_id, |record| {
                        record.status = GenerationStatus::Failed;
                        record.error_message = Some(message.clone());
                    });
                    warn!(generation_id = %generation_id, attempt, "generation failed upstream");
                }
                return;
            }
            Ok(status) => {
                consecutive_transport_failures = 0;
                // Advisory progress: the provider's own hint when present,
                // otherwise a monotonic heuristic capped below completion.
                let progress = status
                    .progress_hint
                    .unwrap_or_else(|| (20 + attempt.saturating_mul(2)).min(95) as u8);
                registry.update(&generation_id, |record| {
                    record.progress_percent = progress;
                });
                debug!(generation_id = %generation_id, attempt, progress, "generation still processing");
            }
            Err(err) if err.is_transport() => {
                consecutive_transport_failures += 1;
                warn!(
                    generation_id = %generation_id,
                    attempt,
                    consecutive = consecutive_transport_failures,
                    error = %err,
                    "poll transport failure"
                );
                if consecutive_transport_failures > polling.max_transport_failures {
                    // The operation is evidently unreachable; fail early
                    // instead of burning the remaining attempt budget.
                    registry.update(&generation_id, |record| {
                        record.status = GenerationStatus::Failed;
                        record.error_message = Some(format!(
                            "poll transport failed {} times in a row: {}",
                            consecutive_transport_failures, err
                        ));
                    });
                    return;
                }
            }
            Err(err) => {
                registry.update(&generation_id, |record| {
                    record.status = GenerationStatus::Failed;
                    record.error_message = Some(err.to_string());
                });
                warn!(generation_id = %generation_id, attempt, error = %err, "poll failed");
                return;
            }
        }
    }

    let timeout = GenerationError::Timeout(TIMED_OUT_MESSAGE.to_string());
    registry.update(&generation_id, |record| {
        record.status = GenerationStatus::Failed;
        record.error_message = Some(timeout.to_string());
    });
    warn!(
        generation_id = %generation_id,
        attempts = polling.max_attempts,
        "generation timed out"
    );
}
