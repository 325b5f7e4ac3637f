//! Generation status records and their registry.
//!
//! The registry is the generation-id-keyed record set the orchestrator
//! mutates and callers poll for progress. Each record has a single writer
//! (its own poll task); the registry enforces that terminal records never
//! transition again, making terminality an invariant rather than a
//! convention. The registry grows until the caller invokes
//! [`StatusRegistry::clear_terminal`] — bounding it is caller responsibility.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::warn;

use crate::provider::OperationHandle;
use crate::types::{ArtifactData, GenerationId};

/// Lifecycle of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }
}

/// Point-in-time state of one generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation_id: GenerationId,
    pub status: GenerationStatus,
    /// Advisory progress estimate in `[0, 100]`. Business logic never
    /// branches on it.
    pub progress_percent: u8,
    pub operation_handle: Option<OperationHandle>,
    pub result: Option<ArtifactData>,
    pub error_message: Option<String>,
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct RecordSlot {
    record: GenerationRecord,
    cancel: Arc<Notify>,
}

/// Shared registry of generation records.
///
/// Constructed once at service start and passed by reference; no module-level
/// singleton.
#[derive(Default)]
pub struct StatusRegistry {
    records: RwLock<HashMap<GenerationId, RecordSlot>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh pending record and its cancellation handle.
    pub fn insert_pending(&self, generation_id: GenerationId) -> (GenerationRecord, Arc<Notify>) {
        let now = Utc::now();
        let record = GenerationRecord {
            generation_id: generation_id.clone(),
            status: GenerationStatus::Pending,
            progress_percent: 0,
            operation_handle: None,
            result: None,
            error_message: None,
            degraded: false,
            created_at: now,
            updated_at: now,
        };
        let cancel = Arc::new(Notify::new());
        self.records.write().insert(
            generation_id,
            RecordSlot {
                record: record.clone(),
                cancel: Arc::clone(&cancel),
            },
        );
        (record, cancel)
    }

    /// Point-in-time snapshot of a record.
    pub fn snapshot(&self, generation_id: &GenerationId) -> Option<GenerationRecord> {
        self.records
            .read()
            .get(generation_id)
            .map(|slot| slot.record.clone())
    }

    /// Apply a mutation to a live record. Returns `false` (and leaves the
    /// record untouched) when the record is unknown or already terminal.
    pub fn update<F>(&self, generation_id: &GenerationId, mutate: F) -> bool
    where
        F: FnOnce(&mut GenerationRecord),
    {
        let mut records = self.records.write();
        let Some(slot) = records.get_mut(generation_id) else {
            return false;
        };
        if slot.record.status.is_terminal() {
            warn!(
                generation_id = %generation_id,
                status = slot.record.status.as_str(),
                "ignoring update to terminal generation record"
            );
            return false;
        }
        mutate(&mut slot.record);
        slot.record.progress_percent = slot.record.progress_percent.min(100);
        slot.record.updated_at = Utc::now();
        true
    }

    /// Cancellation handle for a live (non-terminal) record.
    pub fn cancel_handle(&self, generation_id: &GenerationId) -> Option<Arc<Notify>> {
        let records = self.records.read();
        records
            .get(generation_id)
            .filter(|slot| !slot.record.status.is_terminal())
            .map(|slot| Arc::clone(&slot.cancel))
    }

    /// Remove all completed/failed records. Returns the count removed.
    /// Caller-invoked; never runs automatically.
    pub fn clear_terminal(&self) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, slot| !slot.record.status.is_terminal());
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
