//! Background sweep (spec.md §4.4 `expire()`; SPEC_FULL.md §9 "Background
//! sweep"): a periodic tokio task that reaps stale `PENDING_*` sessions and
//! runs the settlement recovery pass. Modeled on `sig_down.rs`'s spawned
//! task — a `TaskTracker` owns the loop, a `CancellationToken` stops it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::session::SessionStore;
use crate::settlement::recovery::RecoveryPass;

/// Runs [`SessionStore::expire_stale`] and [`RecoveryPass::sweep`] on a fixed
/// interval until `cancellation_token` fires.
pub fn spawn(
    sessions: Arc<SessionStore>,
    recovery: Arc<RecoveryPass>,
    interval: Duration,
    cancellation_token: CancellationToken,
) -> TaskTracker {
    let task_tracker = TaskTracker::new();
    task_tracker.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = ticker.tick() => {
                    match sessions.expire_stale().await {
                        Ok(n) if n > 0 => tracing::info!(count = n, "expired stale signing sessions"),
                        Ok(_) => {}
                        Err(err) => tracing::warn!(error = %err, "session expiry sweep failed"),
                    }
                    match recovery.sweep().await {
                        Ok(n) if n > 0 => tracing::warn!(count = n, "recovery pass caught up settlements"),
                        Ok(_) => {}
                        Err(err) => tracing::warn!(error = %err, "recovery sweep failed"),
                    }
                }
            }
        }
    });
    task_tracker.close();
    task_tracker
}
