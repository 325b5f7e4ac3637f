//! Recurring expiry sweep task.
//!
//! Explicitly startable and stoppable so the owning service (and tests) can
//! tear it down deterministically instead of leaking a free-running timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Handle to the background sweep task for one [`CacheStore`].
pub struct CacheSweeper {
    shutdown: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    /// Spawn the sweep loop. The period normally comes from
    /// `CacheConfig::sweep_period_ms`.
    pub fn start(store: Arc<CacheStore>, period: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let shutdown_rx = Arc::clone(&shutdown);

        let handle = tokio::spawn(async move {
            debug!(period_ms = period.as_millis() as u64, "cache sweeper started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.notified() => {
                        debug!("cache sweeper stopping");
                        break;
                    }
                    _ = sleep(period) => {
                        let removed = store.sweep_expired();
                        if removed > 0 {
                            info!(removed, "cache sweep removed expired entries");
                        }
                    }
                }
            }
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Signal the loop and wait for it to exit. Idempotent.
    pub async fn stop(&mut self) {
        self.shutdown.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        // Best effort: the task also exits on its own once the notify fires.
        self.shutdown.notify_one();
    }
}
