// libs/appointment-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use notification_cell::{NotificationError, RecipientPreferences};
use shared_database::StoreError;
use shared_models::appointment::AppointmentStatus;
use shared_models::error::AppError;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub appointment_type: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// 24h `H:MM` or `HH:MM`
    pub time: String,
    pub client: String,
    #[serde(rename = "case", default)]
    pub case_ref: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// When present, reminders are scheduled right after booking.
    #[serde(default)]
    pub notifications: Option<RecipientPreferences>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub client: Option<String>,
    #[serde(rename = "case")]
    pub case_ref: Option<String>,
    pub description: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn moves_slot(&self) -> bool {
        self.date.is_some() || self.time.is_some()
    }
}

/// Conjunctive listing filters; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilters {
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring of the client name.
    pub client: Option<String>,
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid date format, use YYYY-MM-DD: {0}")]
    InvalidDateFormat(String),

    #[error("Invalid time format, use HH:MM: {0}")]
    InvalidTimeFormat(String),

    #[error("Title must have at least {min} characters")]
    InvalidTitle { min: usize },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Cannot book an appointment in the past")]
    PastDateTime,

    #[error("An appointment already exists at {date} {time}")]
    SlotConflict { date: NaiveDate, time: String },

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment is {0} and can no longer be changed")]
    NotModifiable(AppointmentStatus),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl AppointmentError {
    /// Rejections caused by the request rather than by the system.
    pub fn is_validation(&self) -> bool {
        match self {
            AppointmentError::InvalidDateFormat(_)
            | AppointmentError::InvalidTimeFormat(_)
            | AppointmentError::InvalidTitle { .. }
            | AppointmentError::InvalidDateRange { .. }
            | AppointmentError::PastDateTime
            | AppointmentError::SlotConflict { .. }
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::NotModifiable(_) => true,
            AppointmentError::Notification(e) => e.is_validation(),
            _ => false,
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotConflict { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::Notification(e) => e.into(),
            e if e.is_validation() => AppError::ValidationError(e.to_string()),
            AppointmentError::Store(e) => AppError::Database(e.to_string()),
            e => AppError::Internal(e.to_string()),
        }
    }
}
