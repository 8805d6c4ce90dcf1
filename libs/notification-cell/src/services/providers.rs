//! Delivery providers, one per channel, behind a uniform `send` capability.
//!
//! The bundled providers simulate delivery: they validate the recipient and
//! content, log the message, and fail at a configurable rate. A real SMTP,
//! SMS gateway or push integration implements the same trait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::{Channel, Notification, Recipient, SendResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// The channel this provider delivers on.
    fn channel(&self) -> Channel;

    /// Attempts delivery. Failures are reported in the result, never as a panic or error.
    async fn send(&self, notification: &Notification) -> SendResult;
}

fn simulated_failure(failure_rate: f64) -> bool {
    let rate = failure_rate.clamp(0.0, 1.0);
    rate > 0.0 && rand::thread_rng().gen_bool(rate)
}

fn wrong_recipient(expected: Channel, recipient: &Recipient) -> SendResult {
    SendResult::failed(format!(
        "{} provider cannot deliver to a {} recipient",
        expected,
        recipient.channel()
    ))
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

pub struct EmailProvider {
    failure_rate: f64,
}

impl EmailProvider {
    pub fn new(failure_rate: f64) -> Self {
        Self { failure_rate }
    }
}

#[async_trait]
impl DeliveryProvider for EmailProvider {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, notification: &Notification) -> SendResult {
        let Recipient::Email(address) = &notification.recipient else {
            return wrong_recipient(Channel::Email, &notification.recipient);
        };
        let Some(subject) = notification.content.subject.as_deref() else {
            return SendResult::failed("email subject is missing");
        };

        info!(
            channel = "email",
            notification_id = %notification.id,
            to = %address,
            subject = %subject,
            "Sending email notification"
        );

        if simulated_failure(self.failure_rate) {
            return SendResult::failed("SMTP connection failure");
        }
        SendResult::delivered(Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// SMS
// ---------------------------------------------------------------------------

pub struct SmsProvider {
    failure_rate: f64,
}

impl SmsProvider {
    pub fn new(failure_rate: f64) -> Self {
        Self { failure_rate }
    }
}

#[async_trait]
impl DeliveryProvider for SmsProvider {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(&self, notification: &Notification) -> SendResult {
        let Recipient::Phone(number) = &notification.recipient else {
            return wrong_recipient(Channel::Sms, &notification.recipient);
        };

        info!(
            channel = "sms",
            notification_id = %notification.id,
            to = %number,
            length = notification.content.message.len(),
            "Sending SMS notification"
        );

        if simulated_failure(self.failure_rate) {
            return SendResult::failed("SMS gateway failure");
        }
        SendResult::delivered(Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

pub struct PushProvider {
    failure_rate: f64,
}

impl PushProvider {
    pub fn new(failure_rate: f64) -> Self {
        Self { failure_rate }
    }
}

#[async_trait]
impl DeliveryProvider for PushProvider {
    fn channel(&self) -> Channel {
        Channel::Push
    }

    async fn send(&self, notification: &Notification) -> SendResult {
        let Recipient::PushToken(token) = &notification.recipient else {
            return wrong_recipient(Channel::Push, &notification.recipient);
        };

        info!(
            channel = "push",
            notification_id = %notification.id,
            token = %token,
            title = %notification.content.subject.as_deref().unwrap_or("(untitled)"),
            "Sending push notification"
        );

        if simulated_failure(self.failure_rate) {
            return SendResult::failed("invalid push token");
        }
        SendResult::delivered(Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Channel → provider map, built once at startup.
pub struct ProviderRegistry {
    providers: HashMap<Channel, Arc<dyn DeliveryProvider>>,
    timeout: Duration,
}

impl ProviderRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            timeout,
        }
    }

    /// Email, SMS and push providers with the failure rates from `config`.
    pub fn simulated(config: &AppConfig) -> Self {
        Self::new(Duration::from_secs(config.provider_timeout_seconds))
            .with_provider(Arc::new(EmailProvider::new(config.email_failure_rate)))
            .with_provider(Arc::new(SmsProvider::new(config.sms_failure_rate)))
            .with_provider(Arc::new(PushProvider::new(config.push_failure_rate)))
    }

    pub fn with_provider(mut self, provider: Arc<dyn DeliveryProvider>) -> Self {
        let channel = provider.channel();
        if self.providers.insert(channel, provider).is_some() {
            warn!(%channel, "Replacing previously registered provider");
        }
        self
    }

    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.providers.keys().copied().collect();
        channels.sort();
        channels
    }

    pub fn ensure_registered(&self, channels: &[Channel]) -> Result<(), NotificationError> {
        match channels.iter().find(|c| !self.providers.contains_key(*c)) {
            Some(missing) => Err(NotificationError::ProviderNotRegistered(*missing)),
            None => Ok(()),
        }
    }

    /// Routes `notification` to its channel's provider, bounded by the registry timeout.
    pub async fn dispatch(&self, notification: &Notification) -> SendResult {
        let Some(provider) = self.providers.get(&notification.channel) else {
            return SendResult::failed(format!(
                "no provider registered for channel {}",
                notification.channel
            ));
        };

        match tokio::time::timeout(self.timeout, provider.send(notification)).await {
            Ok(result) => {
                debug!(
                    notification_id = %notification.id,
                    channel = %notification.channel,
                    success = result.success,
                    "Provider returned"
                );
                result
            }
            Err(_) => {
                warn!(
                    notification_id = %notification.id,
                    channel = %notification.channel,
                    "Provider timed out"
                );
                SendResult::failed(format!(
                    "delivery timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
        }
    }
}
