//! Content-addressed artifact cache.
//!
//! Bounded, TTL-expiring store of completed generation artifacts keyed by
//! fingerprint. Reads are never side-effect-free on a hit: they bump access
//! metadata used by the eviction score, and they lazily remove entries past
//! their TTL. Callers own the cache-aside contract — the orchestrator never
//! consults this store on its own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{now_millis, ArtifactData, Fingerprint};

pub mod sweeper;

pub use sweeper::CacheSweeper;

static ENTRY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Cache tuning knobs. The eviction weights are defaults, not a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held at once.
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Per-entry time-to-live in milliseconds, measured from creation.
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,

    /// Cadence of the eager expiry sweep (see [`CacheSweeper`]).
    #[serde(default = "default_sweep_period_ms")]
    pub sweep_period_ms: u64,

    /// Weight of the log-damped access count in the eviction score.
    #[serde(default = "default_frequency_weight")]
    pub frequency_weight: f64,

    /// Weight of the TTL-normalized age-since-last-access in the eviction score.
    #[serde(default = "default_age_weight")]
    pub age_weight: f64,
}

fn default_max_size() -> usize {
    500
}

fn default_max_age_ms() -> u64 {
    1000 * 60 * 60 * 24 // 24 hours
}

fn default_sweep_period_ms() -> u64 {
    1000 * 60 * 5 // 5 minutes
}

fn default_frequency_weight() -> f64 {
    1.0
}

fn default_age_weight() -> f64 {
    2.0
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            max_age_ms: default_max_age_ms(),
            sweep_period_ms: default_sweep_period_ms(),
            frequency_weight: default_frequency_weight(),
            age_weight: default_age_weight(),
        }
    }
}

/// One cached artifact. Owned exclusively by [`CacheStore`]; access metadata
/// is mutated only by the store's own read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    pub subject_id: String,
    pub artifact_type: String,
    pub fingerprint: Fingerprint,
    pub data: ArtifactData,
    pub source_prompt: String,
    pub created_at_ms: u64,
    pub last_accessed_ms: u64,
    pub access_count: u64,
}

impl CacheEntry {
    fn is_expired(&self, now_ms: u64, max_age_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > max_age_ms
    }
}

/// Lock-free hit/miss/eviction counters for one store instance.
#[derive(Debug, Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Point-in-time view of [`CacheStore`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Bounded, TTL-expiring, content-addressed store of completed artifacts.
///
/// Constructed once at service start and passed by reference (`Arc`) to all
/// call sites; there is no process-wide singleton.
pub struct CacheStore {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
    config: CacheConfig,
    metrics: CacheMetrics,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            metrics: CacheMetrics::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Insert a completed artifact, evicting the lowest-scoring entries first
    /// if the store is at capacity. Returns the stored entry.
    pub fn put(
        &self,
        fingerprint: Fingerprint,
        subject_id: &str,
        artifact_type: &str,
        source_prompt: &str,
        data: ArtifactData,
    ) -> CacheEntry {
        self.put_at(
            fingerprint,
            subject_id,
            artifact_type,
            source_prompt,
            data,
            now_millis(),
        )
    }

    /// Deterministic-time variant of [`CacheStore::put`].
    pub fn put_at(
        &self,
        fingerprint: Fingerprint,
        subject_id: &str,
        artifact_type: &str,
        source_prompt: &str,
        data: ArtifactData,
        now_ms: u64,
    ) -> CacheEntry {
        let mut entries = self.entries.write();

        if !entries.contains_key(&fingerprint) && entries.len() >= self.config.max_size {
            let overflow = entries.len() + 1 - self.config.max_size;
            self.evict_locked(&mut entries, overflow, now_ms);
        }

        let entry = CacheEntry {
            id: next_entry_id(now_ms),
            subject_id: subject_id.to_string(),
            artifact_type: artifact_type.to_string(),
            fingerprint: fingerprint.clone(),
            data,
            source_prompt: source_prompt.to_string(),
            created_at_ms: now_ms,
            last_accessed_ms: now_ms,
            access_count: 1,
        };
        entries.insert(fingerprint, entry.clone());
        entry
    }

    /// Look up an artifact by fingerprint.
    ///
    /// An expired entry is removed and reported as absent (lazy expiry). A hit
    /// bumps `access_count` and `last_accessed_ms` before returning a clone.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        self.get_at(fingerprint, now_millis())
    }

    /// Deterministic-time variant of [`CacheStore::get`].
    pub fn get_at(&self, fingerprint: &Fingerprint, now_ms: u64) -> Option<CacheEntry> {
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(fingerprint) else {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        if entry.is_expired(now_ms, self.config.max_age_ms) {
            entries.remove(fingerprint);
            self.metrics.expirations.fetch_add(1, Ordering::Relaxed);
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        entry.access_count += 1;
        entry.last_accessed_ms = now_ms.max(entry.created_at_ms);
        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.clone())
    }

    /// Remove the `n` lowest-scoring entries. Returns how many were removed.
    pub fn evict(&self, n: usize) -> usize {
        let now = now_millis();
        let mut entries = self.entries.write();
        self.evict_locked(&mut entries, n, now)
    }

    fn evict_locked(
        &self,
        entries: &mut HashMap<Fingerprint, CacheEntry>,
        n: usize,
        now_ms: u64,
    ) -> usize {
        if n == 0 || entries.is_empty() {
            return 0;
        }
        let mut scored: Vec<(Fingerprint, f64)> = entries
            .values()
            .map(|e| (e.fingerprint.clone(), self.score(e, now_ms)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut removed = 0;
        for (fingerprint, score) in scored.into_iter().take(n) {
            entries.remove(&fingerprint);
            debug!(fingerprint = %fingerprint, score, "evicted cache entry");
            removed += 1;
        }
        self.metrics
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Eviction score: higher survives longer. The access count is
    /// log-damped and the age since last access is normalized against the TTL
    /// so the two terms share a scale; weights are tunable config.
    fn score(&self, entry: &CacheEntry, now_ms: u64) -> f64 {
        let frequency = (1.0 + entry.access_count as f64).ln();
        let age_ms = now_ms.saturating_sub(entry.last_accessed_ms);
        let age_fraction = age_ms as f64 / self.config.max_age_ms.max(1) as f64;
        self.config.frequency_weight * frequency - self.config.age_weight * age_fraction
    }

    /// Eagerly remove all entries past the TTL. Returns the count removed.
    /// Runs independently of the lazy expiry in `get`; invoked on a fixed
    /// period by [`CacheSweeper`].
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(now_millis())
    }

    /// Deterministic-time variant of [`CacheStore::sweep_expired`].
    pub fn sweep_expired_at(&self, now_ms: u64) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now_ms, self.config.max_age_ms));
        let removed = before - entries.len();
        if removed > 0 {
            self.metrics
                .expirations
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, remaining = entries.len(), "swept expired cache entries");
        }
        removed
    }

    /// Bulk snapshot for handoff to a durable store.
    pub fn export(&self) -> Vec<CacheEntry> {
        self.entries.read().values().cloned().collect()
    }

    /// Bulk restore from a durable store. Entries already past the TTL are
    /// silently skipped; capacity is enforced after the load.
    pub fn import(&self, entries: Vec<CacheEntry>) -> usize {
        self.import_at(entries, now_millis())
    }

    /// Deterministic-time variant of [`CacheStore::import`].
    pub fn import_at(&self, imported: Vec<CacheEntry>, now_ms: u64) -> usize {
        let mut entries = self.entries.write();
        let mut loaded = 0;
        for entry in imported {
            if entry.is_expired(now_ms, self.config.max_age_ms) {
                continue;
            }
            entries.insert(entry.fingerprint.clone(), entry);
            loaded += 1;
        }
        if entries.len() > self.config.max_size {
            let overflow = entries.len() - self.config.max_size;
            self.evict_locked(&mut entries, overflow, now_ms);
        }
        loaded
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            evictions: self.metrics.evictions.load(Ordering::Relaxed),
            expirations: self.metrics.expirations.load(Ordering::Relaxed),
        }
    }
}

fn next_entry_id(now_ms: u64) -> String {
    let seq = ENTRY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("entry-{now_ms}-{seq}")
}
