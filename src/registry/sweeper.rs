//! Periodic reclamation of finished and idle sessions.

use super::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Spawn a task that sweeps `registry` every `every`.
///
/// The first sweep happens one full interval after spawning. The task runs
/// until aborted through the returned handle. Must be called from within a
/// tokio runtime.
pub fn spawn_sweeper(registry: Arc<SessionRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() yields immediately on the first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = registry.remove_stale_sessions();
            if removed > 0 {
                info!(removed, remaining = registry.len(), "swept stale sessions");
            } else {
                debug!(remaining = registry.len(), "sweep found nothing to remove");
            }
        }
    })
}
