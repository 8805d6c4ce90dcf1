use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use shared_config::{AppConfig, ReminderInterval};
use shared_models::appointment::{Appointment, AppointmentStatus};

use crate::clock::ManualClock;

/// Fixed "now" used by tests: 2030-01-01 09:00 UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(test_now()))
}

pub struct TestConfig {
    pub reminder_intervals: Vec<ReminderInterval>,
    pub retry_delay_minutes: Vec<i64>,
    pub max_retries: u32,
    pub batch_size: usize,
    pub display_date_format: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            reminder_intervals: vec![
                ReminderInterval::new(24, "APPOINTMENT_REMINDER_24H"),
                ReminderInterval::new(2, "APPOINTMENT_REMINDER_2H"),
            ],
            retry_delay_minutes: vec![5, 15, 60],
            max_retries: 3,
            batch_size: 50,
            display_date_format: "%d/%m/%Y".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            reminder_intervals: self.reminder_intervals.clone(),
            retry_delay_minutes: self.retry_delay_minutes.clone(),
            max_retries: self.max_retries,
            batch_size: self.batch_size,
            display_date_format: self.display_date_format.clone(),
            provider_timeout_seconds: 2,
            ..AppConfig::default()
        }
        .reliable_delivery()
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestAppointment {
    pub title: String,
    pub appointment_type: String,
    pub client: String,
    pub starts_at: DateTime<Utc>,
}

impl TestAppointment {
    /// An appointment `hours` after `test_now()`, read at UTC.
    pub fn in_hours(hours: i64) -> Self {
        Self {
            title: "Case review".to_string(),
            appointment_type: "meeting".to_string(),
            client: "Ana Lima".to_string(),
            starts_at: test_now() + chrono::Duration::hours(hours),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.starts_at.date_naive()
    }

    pub fn time(&self) -> NaiveTime {
        self.starts_at.time()
    }

    pub fn to_appointment(&self) -> Appointment {
        let now = test_now();
        Appointment {
            id: Uuid::new_v4(),
            title: self.title.clone(),
            appointment_type: self.appointment_type.clone(),
            date: self.date(),
            time: self.time(),
            client: self.client.clone(),
            case_ref: Some("0001234-56.2030.8.26.0100".to_string()),
            description: Some("Bring signed documents".to_string()),
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }
}
