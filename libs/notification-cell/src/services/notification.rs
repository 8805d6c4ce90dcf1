use std::sync::Arc;

use chrono::{Duration, FixedOffset, Offset, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_config::{is_valid_date_format, AppConfig, ReminderInterval};
use shared_models::appointment::Appointment;
use shared_utils::clock::Clock;

use crate::error::NotificationError;
use crate::models::{
    Channel, NewNotification, Notification, NotificationStatus, QueueRunSummary, QueueStats,
    Recipient, RecipientPreferences, SendResult,
};
use crate::services::providers::ProviderRegistry;
use crate::services::repository::NotificationRepository;
use crate::templates::{TemplateCatalog, TemplateVariables};

/// Delay applied once the configured backoff list is exhausted.
pub const FALLBACK_RETRY_DELAY_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub reminder_intervals: Vec<ReminderInterval>,
    pub retry_delay_minutes: Vec<i64>,
    pub max_retries: u32,
    pub batch_size: usize,
    pub claim_ttl: Duration,
    pub display_date_format: String,
    pub utc_offset: FixedOffset,
}

impl NotificationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let utc_offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| {
            warn!(
                "UTC offset of {} minutes is out of range, using UTC",
                config.utc_offset_minutes
            );
            Utc.fix()
        });

        Self {
            reminder_intervals: config.reminder_intervals.clone(),
            retry_delay_minutes: config.retry_delay_minutes.clone(),
            max_retries: config.max_retries,
            batch_size: config.batch_size,
            claim_ttl: Duration::seconds(config.claim_ttl_seconds),
            display_date_format: config.display_date_format.clone(),
            utc_offset,
        }
    }

    /// Backoff before the next attempt, indexed by the attempts already made.
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let minutes = self
            .retry_delay_minutes
            .get(retry_count as usize)
            .copied()
            .unwrap_or(FALLBACK_RETRY_DELAY_MINUTES);
        Duration::minutes(minutes)
    }
}

pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    providers: Arc<ProviderRegistry>,
    templates: Arc<TemplateCatalog>,
    settings: NotificationSettings,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        providers: Arc<ProviderRegistry>,
        templates: Arc<TemplateCatalog>,
        settings: NotificationSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            providers,
            templates,
            settings,
            clock,
        }
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    /// Fails fast on configuration that would otherwise only surface at delivery time.
    pub fn validate_configuration(&self) -> Result<(), NotificationError> {
        if self.settings.reminder_intervals.is_empty() {
            return Err(NotificationError::Configuration(
                "no reminder intervals configured".to_string(),
            ));
        }
        if self.settings.retry_delay_minutes.is_empty() {
            return Err(NotificationError::Configuration(
                "retry delay list is empty".to_string(),
            ));
        }
        if self.settings.max_retries == 0 {
            return Err(NotificationError::Configuration(
                "max retries must be at least 1".to_string(),
            ));
        }
        if self.settings.batch_size == 0 {
            return Err(NotificationError::Configuration(
                "batch size must be at least 1".to_string(),
            ));
        }
        if !is_valid_date_format(&self.settings.display_date_format) {
            return Err(NotificationError::Configuration(format!(
                "display date format '{}' cannot format a date",
                self.settings.display_date_format
            )));
        }
        for interval in &self.settings.reminder_intervals {
            if !self.templates.contains(&interval.template) {
                return Err(NotificationError::Configuration(format!(
                    "reminder interval of {}h references unknown template {}",
                    interval.hours, interval.template
                )));
            }
        }
        self.providers.ensure_registered(&Channel::ALL)?;

        info!(
            intervals = self.settings.reminder_intervals.len(),
            max_retries = self.settings.max_retries,
            "Notification configuration validated"
        );
        Ok(())
    }

    /// Creates one pending notification per (future reminder interval × usable channel).
    #[instrument(skip(self, appointment, preferences), fields(appointment_id = %appointment.id))]
    pub async fn schedule_reminders(
        &self,
        appointment: &Appointment,
        preferences: &RecipientPreferences,
    ) -> Result<Vec<Notification>, NotificationError> {
        let now = self.clock.now();
        let starts_at = appointment.starts_at(self.settings.utc_offset);
        let variables =
            TemplateVariables::for_appointment(appointment, &self.settings.display_date_format);

        let mut created = Vec::new();

        for interval in &self.settings.reminder_intervals {
            let scheduled_for = starts_at - Duration::hours(interval.hours);
            if scheduled_for <= now {
                debug!(hours = interval.hours, "Skipping reminder whose time has already passed");
                continue;
            }

            let content = self.templates.render(&interval.template, &variables)?;

            for channel in preferences.channels() {
                let Some(recipient) = preferences.recipient_for(channel) else {
                    debug!(%channel, "No recipient address for enabled channel, skipping");
                    continue;
                };

                let notification = Notification::new(
                    NewNotification {
                        appointment_id: appointment.id,
                        user_id: appointment.client.clone(),
                        scheduled_for,
                        template_name: interval.template.clone(),
                        recipient,
                        content: content.clone(),
                        max_retries: self.settings.max_retries,
                        status: NotificationStatus::Pending,
                    },
                    now,
                );
                created.push(self.repository.insert(notification).await?);
            }
        }

        info!(count = created.len(), "Reminders scheduled");
        Ok(created)
    }

    /// Renders, persists and delivers a single notification right away.
    #[instrument(skip(self, appointment, recipient), fields(appointment_id = %appointment.id))]
    pub async fn send_immediate_notification(
        &self,
        appointment: &Appointment,
        template_name: &str,
        recipient: Recipient,
        channel: Channel,
    ) -> Result<SendResult, NotificationError> {
        let template = self.templates.get(template_name)?;
        if recipient.channel() != channel {
            return Err(NotificationError::RecipientChannelMismatch {
                channel,
                recipient: recipient.channel(),
            });
        }

        let now = self.clock.now();
        let variables =
            TemplateVariables::for_appointment(appointment, &self.settings.display_date_format);

        // Stored already claimed so a concurrent batch cannot pick it up.
        let notification = self
            .repository
            .insert(Notification::new(
                NewNotification {
                    appointment_id: appointment.id,
                    user_id: appointment.client.clone(),
                    scheduled_for: now,
                    template_name: template_name.to_string(),
                    recipient,
                    content: template.render(&variables),
                    max_retries: 1,
                    status: NotificationStatus::Processing,
                },
                now,
            ))
            .await?;

        let result = self.providers.dispatch(&notification).await;
        self.complete_attempt(&notification, &result).await?;
        Ok(result)
    }

    /// Attempts delivery of up to one batch of due notifications.
    #[instrument(skip(self))]
    pub async fn process_notification_queue(&self) -> Result<QueueRunSummary, NotificationError> {
        let now = self.clock.now();
        let batch = self
            .repository
            .claim_due(now, self.settings.batch_size, self.settings.claim_ttl)
            .await?;

        let mut summary = QueueRunSummary {
            processed: batch.len(),
            ..QueueRunSummary::default()
        };

        for notification in &batch {
            let result = self.providers.dispatch(notification).await;

            match self.complete_attempt(notification, &result).await {
                Ok(_) if result.success => summary.successful += 1,
                Ok(_) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        notification_id = %notification.id,
                        error = %e,
                        "Failed to record delivery attempt"
                    );
                    if let Err(release_err) = self
                        .repository
                        .release_claim(notification.id, self.clock.now())
                        .await
                    {
                        warn!(
                            notification_id = %notification.id,
                            error = %release_err,
                            "Could not release claim; it will expire"
                        );
                    }
                }
            }
        }

        if summary.processed > 0 {
            info!(
                processed = summary.processed,
                successful = summary.successful,
                failed = summary.failed,
                "Notification batch processed"
            );
        }
        Ok(summary)
    }

    /// Cancels every still-pending notification of an appointment.
    #[instrument(skip(self))]
    pub async fn cancel_notifications(&self, appointment_id: Uuid) -> Result<usize, NotificationError> {
        let cancelled = self
            .repository
            .cancel_by_appointment(appointment_id, self.clock.now())
            .await?;
        if cancelled > 0 {
            info!(cancelled, "Pending notifications cancelled");
        }
        Ok(cancelled)
    }

    pub async fn list_notifications(&self, appointment_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        self.repository.find_by_appointment(appointment_id).await
    }

    pub async fn get_notification(&self, id: Uuid) -> Result<Notification, NotificationError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(NotificationError::NotificationNotFound(id))
    }

    pub async fn queue_stats(&self) -> Result<QueueStats, NotificationError> {
        self.repository.stats().await
    }

    /// Persists the outcome of one attempt on a claimed notification.
    async fn complete_attempt(
        &self,
        notification: &Notification,
        result: &SendResult,
    ) -> Result<Notification, NotificationError> {
        let now = self.clock.now();

        if result.success {
            debug!(notification_id = %notification.id, "Notification delivered");
            return self.repository.mark_sent(notification.id, now).await;
        }

        let reason = result.error.as_deref().unwrap_or("unknown delivery error");
        let next_attempt_at = now + self.settings.retry_delay(notification.retry_count);
        let updated = self
            .repository
            .record_failure(notification.id, reason, now, next_attempt_at)
            .await?;

        match updated.status {
            NotificationStatus::Failed => warn!(
                notification_id = %notification.id,
                retry_count = updated.retry_count,
                error = %reason,
                "Notification failed permanently"
            ),
            _ => info!(
                notification_id = %notification.id,
                retry_count = updated.retry_count,
                next_attempt_at = %updated.scheduled_for,
                error = %reason,
                "Notification rescheduled after failed attempt"
            ),
        }
        Ok(updated)
    }
}
