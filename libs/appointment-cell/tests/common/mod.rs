#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use appointment_cell::*;
use notification_cell::{
    InMemoryNotificationRepository, NotificationService, NotificationSettings, ProviderRegistry,
    TemplateCatalog,
};
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_utils::clock::{Clock, ManualClock};
use shared_utils::test_utils::{test_clock, TestAppointment, TestConfig};

pub struct TestHarness {
    pub booking: Arc<AppointmentBookingService>,
    pub notifications: Arc<NotificationService>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryAppointmentRepository::new()))
    }

    pub fn with_repository(repository: Arc<dyn AppointmentRepository>) -> Self {
        let config = TestConfig::default().to_app_config();
        let clock = test_clock();

        let notifications = Arc::new(NotificationService::new(
            Arc::new(InMemoryNotificationRepository::new()),
            Arc::new(ProviderRegistry::simulated(&config)),
            Arc::new(TemplateCatalog::default()),
            NotificationSettings::from_config(&config),
            clock.clone() as Arc<dyn Clock>,
        ));
        let booking = Arc::new(AppointmentBookingService::new(
            repository,
            notifications.clone(),
            clock.clone() as Arc<dyn Clock>,
        ));

        Self {
            booking,
            notifications,
            clock,
        }
    }
}

/// A valid booking request `hours` after the test clock's start.
pub fn request_in_hours(hours: i64) -> CreateAppointmentRequest {
    let fixture = TestAppointment::in_hours(hours);
    CreateAppointmentRequest {
        title: fixture.title,
        appointment_type: fixture.appointment_type,
        date: fixture.starts_at.format("%Y-%m-%d").to_string(),
        time: fixture.starts_at.format("%H:%M").to_string(),
        client: fixture.client,
        case_ref: None,
        description: None,
        notifications: None,
    }
}

pub fn request_at(date: &str, time: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        date: date.to_string(),
        time: time.to_string(),
        ..request_in_hours(48)
    }
}

/// In-memory store that hands control back to the runtime before lookups and
/// conflict checks, so concurrent service calls interleave at those points.
#[derive(Default)]
pub struct YieldingRepository {
    inner: InMemoryAppointmentRepository,
}

async fn yield_a_few() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl AppointmentRepository for YieldingRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        self.inner.insert(appointment).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        yield_a_few().await;
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self, filters: &AppointmentFilters) -> Result<Vec<Appointment>, AppointmentError> {
        self.inner.find_all(filters).await
    }

    async fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.inner.find_by_date_range(start, end).await
    }

    async fn has_conflict(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        yield_a_few().await;
        self.inner.has_conflict(date, time, exclude).await
    }

    async fn replace(&self, appointment: Appointment) -> Result<Option<Appointment>, AppointmentError> {
        self.inner.replace(appointment).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        self.inner.update_status(id, status, now).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError> {
        self.inner.delete(id).await
    }
}
