//! Periodic eviction of expired rule cache entries

use std::sync::Arc;
use std::time::Duration;

use civicdesk_core::RuleCache;
use tokio::task::JoinHandle;

/// Spawn a task that sweeps `cache` every `period` until aborted
pub fn spawn_cache_sweeper(cache: Arc<RuleCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = cache.sweep_expired();
            if evicted > 0 {
                tracing::debug!(evicted, remaining = cache.len(), "Swept rule cache");
            }
        }
    })
}
