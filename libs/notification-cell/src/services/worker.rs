use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::QueueRunSummary;
use crate::services::notification::NotificationService;

/// Drives `process_notification_queue` on a fixed interval until cancelled.
///
/// A tick that fails is logged and the loop keeps going; the next tick picks
/// up whatever is still due. Ticks never overlap because the batch is awaited
/// inside the loop.
pub struct QueueProcessor {
    service: Arc<NotificationService>,
    interval: Duration,
}

impl QueueProcessor {
    pub fn new(service: Arc<NotificationService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Notification queue processor started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Notification queue processor stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Runs one batch and logs its outcome.
    pub async fn tick(&self) -> Option<QueueRunSummary> {
        match self.service.process_notification_queue().await {
            Ok(summary) => {
                if summary.processed == 0 {
                    debug!("No notifications due");
                } else if summary.failed > 0 {
                    warn!(
                        processed = summary.processed,
                        successful = summary.successful,
                        failed = summary.failed,
                        "Notification batch finished with failures"
                    );
                } else {
                    info!(processed = summary.processed, "Notification batch delivered");
                }
                Some(summary)
            }
            Err(e) => {
                error!(error = %e, "Notification queue run failed");
                None
            }
        }
    }
}
