//! Periodic eviction of finished jobs.
//!
//! Terminal jobs are also evicted lazily when polled; this loop catches the
//! ones nobody polls again.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::tracker::JobTracker;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(tracker: Arc<JobTracker>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Job reaper started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job reaper stopping");
                break;
            }
            _ = ticker.tick() => {
                let purged = tracker.purge_expired().await;
                if purged > 0 {
                    tracing::info!(purged, "Job reaper: evicted expired jobs");
                } else {
                    tracing::debug!("Job reaper: nothing to evict");
                }
            }
        }
    }
}
