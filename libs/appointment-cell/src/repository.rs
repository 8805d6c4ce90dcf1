use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use shared_database::MemoryCollection;
use shared_models::appointment::{Appointment, AppointmentStatus};

use crate::models::{AppointmentError, AppointmentFilters};

/// Persistence for appointment records. Listings come back sorted by (date, time).
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    async fn find_all(&self, filters: &AppointmentFilters) -> Result<Vec<Appointment>, AppointmentError>;

    /// Appointments dated within `[start, end]`.
    async fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Whether a slot-occupying appointment other than `exclude` sits at exactly `date` `time`.
    async fn has_conflict(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppointmentError>;

    /// Replaces the stored record with `appointment`. `None` if it no longer
    /// exists; refused if the stored record has already reached a terminal status.
    async fn replace(&self, appointment: Appointment) -> Result<Option<Appointment>, AppointmentError>;

    /// Sets `status` unless the stored record is already terminal.
    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Appointment>, AppointmentError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError>;
}

pub struct InMemoryAppointmentRepository {
    collection: MemoryCollection<Appointment>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self {
            collection: MemoryCollection::new("appointments"),
        }
    }
}

impl Default for InMemoryAppointmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filters(appointment: &Appointment, filters: &AppointmentFilters) -> bool {
    if filters.date.is_some_and(|date| appointment.date != date) {
        return false;
    }
    if filters.status.is_some_and(|status| appointment.status != status) {
        return false;
    }
    if let Some(kind) = &filters.appointment_type {
        if &appointment.appointment_type != kind {
            return false;
        }
    }
    if let Some(client) = &filters.client {
        let needle = client.to_lowercase();
        if !appointment.client.to_lowercase().contains(&needle) {
            return false;
        }
    }
    true
}

fn sort_by_slot(appointments: &mut [Appointment]) {
    appointments.sort_by_key(|a| (a.date, a.time, a.created_at));
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        Ok(self.collection.insert(appointment).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.collection.get(id).await?)
    }

    async fn find_all(&self, filters: &AppointmentFilters) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self.collection.find(|a| matches_filters(a, filters)).await?;
        sort_by_slot(&mut appointments);
        Ok(appointments)
    }

    async fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self
            .collection
            .find(|a| a.date >= start && a.date <= end)
            .await?;
        sort_by_slot(&mut appointments);
        Ok(appointments)
    }

    async fn has_conflict(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        let clash = self
            .collection
            .find_one(|a| {
                a.date == date && a.time == time && a.occupies_slot() && Some(a.id) != exclude
            })
            .await?;
        Ok(clash.is_some())
    }

    async fn replace(&self, appointment: Appointment) -> Result<Option<Appointment>, AppointmentError> {
        let id = appointment.id;
        self.collection
            .modify(id, move |stored| {
                if stored.status.is_terminal() {
                    return Err(AppointmentError::NotModifiable(stored.status));
                }
                *stored = appointment;
                Ok(stored.clone())
            })
            .await?
            .transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        self.collection
            .modify(id, |stored| {
                if stored.status.is_terminal() {
                    return Err(AppointmentError::InvalidStatusTransition {
                        from: stored.status,
                        to: status,
                    });
                }
                stored.status = status;
                stored.updated_at = now;
                Ok(stored.clone())
            })
            .await?
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.collection.delete(id).await?)
    }
}
