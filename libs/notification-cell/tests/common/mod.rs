#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use notification_cell::*;
use shared_utils::clock::{Clock, ManualClock};
use shared_utils::test_utils::{test_clock, TestConfig};

pub struct TestHarness {
    pub service: Arc<NotificationService>,
    pub repository: Arc<InMemoryNotificationRepository>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    /// Reliable simulated providers on every channel.
    pub fn new() -> Self {
        let config = TestConfig::default().to_app_config();
        Self::with_registry(&TestConfig::default(), ProviderRegistry::simulated(&config))
    }

    pub fn with_registry(config: &TestConfig, registry: ProviderRegistry) -> Self {
        let clock = test_clock();
        let repository = Arc::new(InMemoryNotificationRepository::new());
        let service = Arc::new(NotificationService::new(
            repository.clone(),
            Arc::new(registry),
            Arc::new(TemplateCatalog::default()),
            NotificationSettings::from_config(&config.to_app_config()),
            clock.clone() as Arc<dyn Clock>,
        ));

        Self {
            service,
            repository,
            clock,
        }
    }

    /// Every email attempt fails with "SMTP connection failure".
    pub fn failing_email() -> Self {
        Self::with_registry(
            &TestConfig::default(),
            ProviderRegistry::new(Duration::from_secs(2))
                .with_provider(Arc::new(EmailProvider::new(1.0))),
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Stores a pending email notification due at `scheduled_for`.
    pub async fn insert_pending(&self, scheduled_for: DateTime<Utc>) -> Notification {
        self.insert_with_status(scheduled_for, NotificationStatus::Pending)
            .await
    }

    pub async fn insert_with_status(
        &self,
        scheduled_for: DateTime<Utc>,
        status: NotificationStatus,
    ) -> Notification {
        self.repository
            .insert(Notification::new(
                NewNotification {
                    appointment_id: Uuid::new_v4(),
                    user_id: "Ana Lima".to_string(),
                    scheduled_for,
                    template_name: APPOINTMENT_REMINDER_2H.to_string(),
                    recipient: Recipient::Email("ana@example.com".to_string()),
                    content: NotificationContent {
                        subject: Some("Reminder".to_string()),
                        message: "See you soon".to_string(),
                    },
                    max_retries: 3,
                    status,
                },
                self.now(),
            ))
            .await
            .expect("insert notification")
    }

    pub async fn reload(&self, id: Uuid) -> Notification {
        self.repository
            .find_by_id(id)
            .await
            .expect("store available")
            .expect("notification exists")
    }
}

/// Email provider that counts calls and always delivers.
#[derive(Default)]
pub struct CountingProvider {
    pub calls: AtomicUsize,
}

impl CountingProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliveryProvider for CountingProvider {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, notification: &Notification) -> SendResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        SendResult::delivered(notification.id.to_string())
    }
}

pub fn email_and_sms() -> RecipientPreferences {
    RecipientPreferences {
        email: Some("ana@example.com".to_string()),
        phone: Some("+5511999990000".to_string()),
        push_token: None,
        enabled_types: vec![Channel::Email, Channel::Sms],
    }
}
