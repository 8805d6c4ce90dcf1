use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_database::MemoryCollection;

use crate::error::NotificationError;
use crate::models::{Notification, NotificationStatus, QueueStats};

/// Persistence for notification records.
///
/// Every method is a single atomic store operation. Attempt results
/// (`mark_sent`, `record_failure`, `release_claim`) only apply to records the
/// caller previously claimed.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification, NotificationError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, NotificationError>;

    /// All notifications of an appointment, ordered by `scheduled_for`.
    async fn find_by_appointment(&self, appointment_id: Uuid) -> Result<Vec<Notification>, NotificationError>;

    /// Moves up to `limit` due records (oldest `scheduled_for` first) to
    /// `Processing` and returns them. Records whose claim is older than
    /// `claim_ttl` are claimable again.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        claim_ttl: Duration,
    ) -> Result<Vec<Notification>, NotificationError>;

    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> Result<Notification, NotificationError>;

    /// Counts one failed attempt. The record becomes `Failed` once its retry
    /// budget is spent, otherwise `Pending` again at `next_attempt_at`.
    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        now: DateTime<Utc>,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<Notification, NotificationError>;

    /// Returns a claimed record to `Pending` without counting an attempt.
    async fn release_claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<Notification, NotificationError>;

    /// Cancels every still-pending notification of an appointment.
    async fn cancel_by_appointment(&self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<usize, NotificationError>;

    async fn stats(&self) -> Result<QueueStats, NotificationError>;
}

pub struct InMemoryNotificationRepository {
    collection: MemoryCollection<Notification>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self {
            collection: MemoryCollection::new("notifications"),
        }
    }

    async fn transition<F>(
        &self,
        id: Uuid,
        target: NotificationStatus,
        apply: F,
    ) -> Result<Notification, NotificationError>
    where
        F: FnOnce(&mut Notification) + Send,
    {
        self.collection
            .modify(id, |notification| {
                if !notification.status.can_transition_to(&target) {
                    return Err(NotificationError::InvalidStatusTransition {
                        from: notification.status,
                        to: target,
                    });
                }
                apply(notification);
                notification.claimed_at = None;
                Ok(notification.clone())
            })
            .await?
            .ok_or(NotificationError::NotificationNotFound(id))?
    }
}

impl Default for InMemoryNotificationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<Notification, NotificationError> {
        Ok(self.collection.insert(notification).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, NotificationError> {
        Ok(self.collection.get(id).await?)
    }

    async fn find_by_appointment(&self, appointment_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        let mut notifications = self
            .collection
            .find(|n| n.appointment_id == appointment_id)
            .await?;
        notifications.sort_by_key(|n| (n.scheduled_for, n.created_at));
        Ok(notifications)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        claim_ttl: Duration,
    ) -> Result<Vec<Notification>, NotificationError> {
        let claimed = self
            .collection
            .update_many_ordered(
                |n| n.is_due(now) || n.claim_expired(now, claim_ttl),
                |n| n.scheduled_for,
                limit,
                |n| {
                    n.status = NotificationStatus::Processing;
                    n.claimed_at = Some(now);
                    n.updated_at = now;
                },
            )
            .await?;

        debug!(claimed = claimed.len(), "Claimed due notifications");
        Ok(claimed)
    }

    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> Result<Notification, NotificationError> {
        self.transition(id, NotificationStatus::Sent, |n| {
            n.status = NotificationStatus::Sent;
            n.sent_at = Some(sent_at);
            n.updated_at = sent_at;
        })
        .await
    }

    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        now: DateTime<Utc>,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<Notification, NotificationError> {
        let error = error.to_string();
        self.collection
            .modify(id, move |n| {
                let target = if n.retry_count + 1 >= n.max_retries {
                    NotificationStatus::Failed
                } else {
                    NotificationStatus::Pending
                };
                if !n.status.can_transition_to(&target) {
                    return Err(NotificationError::InvalidStatusTransition {
                        from: n.status,
                        to: target,
                    });
                }

                n.retry_count = (n.retry_count + 1).min(n.max_retries);
                n.status = target;
                if target == NotificationStatus::Pending {
                    n.scheduled_for = next_attempt_at;
                }
                n.error_message = Some(error);
                n.claimed_at = None;
                n.updated_at = now;
                Ok(n.clone())
            })
            .await?
            .ok_or(NotificationError::NotificationNotFound(id))?
    }

    async fn release_claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<Notification, NotificationError> {
        self.transition(id, NotificationStatus::Pending, |n| {
            n.status = NotificationStatus::Pending;
            n.updated_at = now;
        })
        .await
    }

    async fn cancel_by_appointment(&self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<usize, NotificationError> {
        let cancelled = self
            .collection
            .update_many(
                |n| n.appointment_id == appointment_id && n.status == NotificationStatus::Pending,
                |n| {
                    n.status = NotificationStatus::Cancelled;
                    n.updated_at = now;
                },
            )
            .await?;
        Ok(cancelled)
    }

    async fn stats(&self) -> Result<QueueStats, NotificationError> {
        let all = self.collection.find(|_| true).await?;
        let mut stats = QueueStats::default();
        for notification in &all {
            stats.record(notification.status);
        }
        Ok(stats)
    }
}
