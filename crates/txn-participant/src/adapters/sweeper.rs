//! Background reclamation of orphaned `PREPARED` transactions.

use crate::ports::ParticipantApi;
use shared_http::ServiceMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Run `sweep_orphans` every `interval` until `shutdown` flips to `true`
/// or its sender is dropped.
pub fn spawn_sweeper(
    participant: Arc<dyn ParticipantApi>,
    interval: Duration,
    metrics: Arc<ServiceMetrics>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = interval.as_secs(), "Orphan sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match participant.sweep_orphans().await {
                        Ok(swept) => {
                            metrics.record_swept(swept.len());
                            debug!(swept = swept.len(), "Orphan sweep finished");
                        }
                        Err(e) => error!(error = %e, "Orphan sweep failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Orphan sweeper stopped");
    })
}
