//! Shared test utilities for integration tests
//!
//! Provides scriptable in-memory provider and describer implementations so
//! flows can be exercised without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use clipforge::error::GenerationError;
use clipforge::fallback::FallbackDescriber;
use clipforge::orchestrator::{GenerationOrchestrator, GenerationRequest};
use clipforge::provider::{OperationHandle, PollStatus, SubmitRequest, VideoProvider};
use clipforge::registry::GenerationRecord;
use clipforge::types::GenerationId;

/// Provider whose poll responses are scripted up front. Once the script is
/// exhausted it keeps reporting "still processing".
pub struct ScriptedProvider {
    submit_error: Mutex<Option<GenerationError>>,
    polls: Mutex<VecDeque<Result<PollStatus, GenerationError>>>,
    submissions: AtomicU32,
}

impl ScriptedProvider {
    pub fn accepting(polls: Vec<Result<PollStatus, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            submit_error: Mutex::new(None),
            polls: Mutex::new(polls.into()),
            submissions: AtomicU32::new(0),
        })
    }

    pub fn rejecting(err: GenerationError) -> Arc<Self> {
        Arc::new(Self {
            submit_error: Mutex::new(Some(err)),
            polls: Mutex::new(VecDeque::new()),
            submissions: AtomicU32::new(0),
        })
    }

    pub fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn still_processing() -> Result<PollStatus, GenerationError> {
        Ok(PollStatus::default())
    }

    pub fn finished(locator: &str) -> Result<PollStatus, GenerationError> {
        Ok(PollStatus {
            done: true,
            result_locator: Some(locator.to_string()),
            ..PollStatus::default()
        })
    }
}

#[async_trait]
impl VideoProvider for ScriptedProvider {
    async fn start(&self, _request: &SubmitRequest) -> Result<OperationHandle, GenerationError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        match self.submit_error.lock().as_ref() {
            Some(GenerationError::Transport(msg)) => Err(GenerationError::Transport(msg.clone())),
            Some(GenerationError::Upstream(msg)) => Err(GenerationError::Upstream(msg.clone())),
            Some(err) => Err(GenerationError::Upstream(err.to_string())),
            None => Ok(OperationHandle(format!("op-{}", n + 1))),
        }
    }

    async fn poll(&self, _handle: &OperationHandle) -> Result<PollStatus, GenerationError> {
        self.polls
            .lock()
            .pop_front()
            .unwrap_or_else(Self::still_processing)
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// Describer with a fixed outcome and a call counter.
pub struct ScriptedDescriber {
    outcome: Result<String, String>,
    calls: AtomicU32,
}

impl ScriptedDescriber {
    pub fn succeeding(text: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(text.to_string()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(message.to_string()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackDescriber for ScriptedDescriber {
    async fn describe(&self, _prompt_text: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(GenerationError::Fallback)
    }
}

/// Standard request used across flow tests.
pub fn sample_request() -> GenerationRequest {
    GenerationRequest {
        subject_id: "case-042".to_string(),
        artifact_type: "scene".to_string(),
        prompt_text: "a lighthouse keeper rowing through a storm at dusk".to_string(),
        aspect_ratio: None,
        resolution: None,
    }
}

/// Poll the orchestrator until the record reaches a terminal state.
pub async fn wait_terminal(
    orchestrator: &GenerationOrchestrator,
    id: &GenerationId,
) -> GenerationRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let record = orchestrator.get_status(id).expect("record exists");
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("generation reached a terminal state")
}
