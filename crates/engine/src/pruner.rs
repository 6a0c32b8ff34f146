//! Background pruning of stale, superseded tracker entries
//!
//! One pruner runs per tracked scope with pruning enabled. Each sweep
//! bulk-deletes entries that satisfy BOTH conditions:
//! - `invalidate` (the entry's lifespan at supersession) is below the
//!   retention threshold: short-lived entries carry little audit value
//! - `created_at` is older than the floor age: recent entries always
//!   survive, whatever their lifespan
//!
//! Sweeps are advisory: a failure is logged and retried on the next
//! interval, and races with concurrent supersession stamps are
//! acceptable.
//!
//! # Design Notes
//!
//! - The pruner is an explicit handle the host starts, stops, and joins;
//!   registration never spawns it as a side effect
//! - Graceful shutdown via atomic flag, polled at sub-intervals so
//!   `join` returns promptly; an in-flight delete finishes first
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chronicle_engine::{Pruner, PrunerConfig};
//! use chronicle_store::MemoryTrackerStore;
//!
//! let store = Arc::new(MemoryTrackerStore::new());
//! let pruner = Pruner::new(Arc::clone(&store) as _, "order", PrunerConfig::default());
//! let handle = pruner.start();
//!
//! // ... application runs ...
//!
//! pruner.shutdown();
//! handle.join().unwrap();
//! ```

use chronicle_core::{EntryFilter, Result, Timestamp, TrackerStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sweep cadence and deletion thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunerConfig {
    /// How often to sweep
    pub interval: Duration,
    /// Entries whose supersession lifespan is below this are candidates
    pub retention: Duration,
    /// Entries younger than this never prune
    pub floor_age: Duration,
}

impl Default for PrunerConfig {
    fn default() -> Self {
        PrunerConfig {
            interval: Duration::from_secs(24 * 3600),
            retention: Duration::from_secs(3600),
            floor_age: Duration::from_secs(24 * 3600),
        }
    }
}

/// Background pruning task for one tracked scope
pub struct Pruner {
    store: Arc<dyn TrackerStore>,
    scope: String,
    config: PrunerConfig,
    shutdown: Arc<AtomicBool>,
}

impl Pruner {
    /// Create a pruner for a scope (not yet running)
    pub fn new(store: Arc<dyn TrackerStore>, scope: impl Into<String>, config: PrunerConfig) -> Self {
        Pruner {
            store,
            scope: scope.into(),
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the background sweep loop
    ///
    /// Returns the JoinHandle; the thread runs until `shutdown()`.
    pub fn start(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let scope = self.scope.clone();
        let config = self.config;
        let shutdown = Arc::clone(&self.shutdown);

        thread::spawn(move || {
            info!(scope = %scope, "pruner started");
            while !shutdown.load(Ordering::Relaxed) {
                // Sleep first (no sweep immediately on start), polling
                // shutdown at sub-intervals so join returns promptly
                let slice = Duration::from_millis(100).min(config.interval);
                let mut elapsed = Duration::ZERO;
                while elapsed < config.interval {
                    if shutdown.load(Ordering::Relaxed) {
                        info!(scope = %scope, "pruner stopped");
                        return;
                    }
                    thread::sleep(slice);
                    elapsed += slice;
                }

                match sweep(store.as_ref(), &scope, &config) {
                    Ok(0) => {}
                    Ok(deleted) => debug!(scope = %scope, deleted, "pruned stale entries"),
                    // Sweep failures never terminate the loop; retry next interval
                    Err(error) => warn!(scope = %scope, %error, "pruning sweep failed"),
                }
            }
            info!(scope = %scope, "pruner stopped");
        })
    }

    /// Run one sweep immediately, returning how many entries were deleted
    ///
    /// Exposed so hosts (and tests) can prune deterministically.
    pub fn sweep(&self) -> Result<usize> {
        sweep(self.store.as_ref(), &self.scope, &self.config)
    }

    /// Signal the background loop to exit
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been signaled
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn sweep(store: &dyn TrackerStore, scope: &str, config: &PrunerConfig) -> Result<usize> {
    let filter = EntryFilter {
        scope: Some(scope.to_string()),
        invalidate_below: Some(config.retention.as_millis() as u64),
        created_before: Some(Timestamp::now().saturating_sub(config.floor_age)),
        ..Default::default()
    };
    store.bulk_delete(&filter)
}
