//! Periodic purge of abandoned paused executions.

use crate::continuation::ContinuationRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Spawn a task that sweeps `registry` every `every`.
///
/// Does nothing useful when the registry has no TTL; the task still runs so
/// callers can treat the handle uniformly. Abort the handle to stop it.
pub fn spawn_sweeper(registry: Arc<ContinuationRegistry>, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_millis(10));
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = registry.sweep_expired();
            if !purged.is_empty() {
                tracing::warn!(
                    purged = purged.len(),
                    remaining = registry.pending_count(),
                    "swept abandoned paused executions"
                );
            }
        }
    })
}
