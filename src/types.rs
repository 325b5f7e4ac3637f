//! Shared identifiers and payload types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

static GENERATION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one generation request, unique within and across
/// processes (timestamp + pid + sequence).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationId(String);

impl GenerationId {
    pub fn next() -> Self {
        let ts = now_millis();
        let pid = std::process::id();
        let seq = GENERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
        GenerationId(format!("gen-{ts}-{pid}-{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GenerationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GenerationId {
    fn from(value: String) -> Self {
        GenerationId(value)
    }
}

/// Content fingerprint: deterministic cache key derived from
/// `(subject_id, artifact_type, prompt_text)`. See [`crate::fingerprint`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub(crate) String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Completed artifact payload: a remote locator for a rendered clip, or
/// inline text when the result is a degraded fallback description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArtifactData {
    Locator(String),
    Inline(String),
}

impl ArtifactData {
    pub fn as_str(&self) -> &str {
        match self {
            ArtifactData::Locator(s) | ArtifactData::Inline(s) => s,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ArtifactData::Inline(_))
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
