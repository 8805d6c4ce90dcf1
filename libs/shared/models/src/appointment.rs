use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::Document;

// ==============================================================================
// APPOINTMENT RECORD
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub appointment_type: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Client identifier or display name.
    pub client: String,
    #[serde(rename = "case", skip_serializing_if = "Option::is_none")]
    pub case_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Absolute start instant, reading `date`/`time` as wall-clock time at `offset`.
    pub fn starts_at(&self, offset: FixedOffset) -> DateTime<Utc> {
        local_to_utc(self.date, self.time, offset)
    }

    pub fn occupies_slot(&self) -> bool {
        self.status.occupies_slot()
    }
}

impl Document for Appointment {
    fn id(&self) -> Uuid {
        self.id
    }
}

pub fn local_to_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    date.and_time(time).and_utc() - Duration::seconds(offset.local_minus_utc() as i64)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    /// Every status except `Cancelled` keeps its (date, time) slot taken.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

/// Serializes a time of day as 24h `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            title: "Initial hearing".to_string(),
            appointment_type: "hearing".to_string(),
            date: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
            time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            client: "Maria Souza".to_string(),
            case_ref: Some("0001234-56.2030".to_string()),
            description: None,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn starts_at_applies_offset() {
        let appointment = sample();
        let utc = appointment.starts_at(FixedOffset::east_opt(0).unwrap());
        assert_eq!(utc.to_rfc3339(), "2030-01-10T14:00:00+00:00");

        let brt = appointment.starts_at(FixedOffset::west_opt(3 * 3600).unwrap());
        assert_eq!(brt.to_rfc3339(), "2030-01-10T17:00:00+00:00");
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "hearing");
        assert_eq!(json["time"], "14:00");
        assert_eq!(json["date"], "2030-01-10");
        assert_eq!(json["case"], "0001234-56.2030");
        assert_eq!(json["status"], "scheduled");
        assert!(json.get("description").is_none());

        let back: Appointment = serde_json::from_value(json).unwrap();
        assert_eq!(back.time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
    }

    #[test]
    fn only_cancelled_frees_the_slot() {
        assert!(AppointmentStatus::Scheduled.occupies_slot());
        assert!(AppointmentStatus::Rescheduled.occupies_slot());
        assert!(AppointmentStatus::Completed.occupies_slot());
        assert!(!AppointmentStatus::Cancelled.occupies_slot());
    }
}
