//! Error types for generation orchestration.
//!
//! A cache miss is not an error; cache lookups return `Option`. Everything
//! that can terminate a generation carries a human-readable message so a
//! failed record can surface it to the caller.

use thiserror::Error;

/// Errors produced by the orchestration core and its provider clients.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Missing or invalid configuration (credentials, endpoints). Fatal,
    /// surfaced at call time, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-level failure talking to a provider. Not retried on submit;
    /// tolerated up to a consecutive-failure budget while polling.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Explicit error payload from the primary provider. Terminal.
    #[error("Provider error: {0}")]
    Upstream(String),

    /// Poll attempt budget exhausted without a terminal result.
    #[error("{0}")]
    Timeout(String),

    /// Request failed validation before submission.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The degraded-path describer failed.
    #[error("Fallback failed: {0}")]
    Fallback(String),

    /// No generation record for the given id.
    #[error("Generation not found: {0}")]
    NotFound(String),
}

impl GenerationError {
    /// True for transport-level failures that the poll loop may tolerate.
    pub fn is_transport(&self) -> bool {
        matches!(self, GenerationError::Transport(_))
    }
}
