// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use notification_cell::{
    Channel, Notification, NotificationService, Recipient, RecipientPreferences, SendResult,
};
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_utils::clock::Clock;

use crate::models::{
    AppointmentError, AppointmentFilters, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::repository::AppointmentRepository;
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::validation::{ensure_not_past, parse_date, parse_time, validate_title};

/// Host-facing facade over appointments and their notifications.
pub struct AppointmentBookingService {
    repository: Arc<dyn AppointmentRepository>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    notifications: Arc<NotificationService>,
    clock: Arc<dyn Clock>,
    utc_offset: FixedOffset,
    /// Serialises every appointment write together with its reminder side
    /// effects, so a status or slot check cannot go stale before its write lands.
    write_guard: Mutex<()>,
}

impl AppointmentBookingService {
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        notifications: Arc<NotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let utc_offset = notifications.settings().utc_offset;
        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&repository)),
            lifecycle_service: AppointmentLifecycleService::new(),
            repository,
            notifications,
            clock,
            utc_offset,
            write_guard: Mutex::new(()),
        }
    }

    /// Validates, conflict-checks and stores a new appointment, then schedules
    /// reminders when the request carries recipient preferences.
    #[instrument(skip(self, request), fields(client = %request.client))]
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let title = validate_title(&request.title)?;
        let date = parse_date(&request.date)?;
        let time = parse_time(&request.time)?;

        let _write = self.write_guard.lock().await;
        let now = self.clock.now();

        ensure_not_past(date, time, self.utc_offset, now)?;
        self.conflict_service.ensure_slot_free(date, time, None).await?;

        let appointment = self
            .repository
            .insert(Appointment {
                id: Uuid::new_v4(),
                title,
                appointment_type: request.appointment_type,
                date,
                time,
                client: request.client,
                case_ref: request.case_ref,
                description: request.description,
                status: AppointmentStatus::Scheduled,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("Appointment {} booked for {} {}", appointment.id, appointment.date, appointment.time);

        if let Some(preferences) = request.notifications {
            // The booking stands even if reminders cannot be scheduled.
            match self
                .notifications
                .schedule_reminders(&appointment, &preferences)
                .await
            {
                Ok(created) => debug!("Scheduled {} reminders for {}", created.len(), appointment.id),
                Err(e) => warn!("Failed to schedule reminders for {}: {}", appointment.id, e),
            }
        }

        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        filters: &AppointmentFilters,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.repository.find_all(filters).await
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn list_appointments_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if start > end {
            return Err(AppointmentError::InvalidDateRange { start, end });
        }
        self.repository.find_by_date_range(start, end).await
    }

    /// Applies a partial update. Moving the slot re-runs the past and conflict
    /// checks, marks the appointment rescheduled and cancels its pending reminders.
    #[instrument(skip(self, request))]
    pub async fn update_appointment(
        &self,
        id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let title = request.title.as_deref().map(validate_title).transpose()?;
        let new_date = request.date.as_deref().map(parse_date).transpose()?;
        let new_time = request.time.as_deref().map(parse_time).transpose()?;

        let _write = self.write_guard.lock().await;
        let (updated, moved) = {
            let now = self.clock.now();

            let mut appointment = self.get_appointment(id).await?;
            self.lifecycle_service.ensure_modifiable(appointment.status)?;

            let date = new_date.unwrap_or(appointment.date);
            let time = new_time.unwrap_or(appointment.time);
            let moved = date != appointment.date || time != appointment.time;

            if request.moves_slot() {
                ensure_not_past(date, time, self.utc_offset, now)?;
                self.conflict_service.ensure_slot_free(date, time, Some(id)).await?;
            }

            if moved {
                appointment.status = self.lifecycle_service.status_after_move(appointment.status);
            }
            appointment.date = date;
            appointment.time = time;
            if let Some(title) = title {
                appointment.title = title;
            }
            if let Some(kind) = request.appointment_type {
                appointment.appointment_type = kind;
            }
            if let Some(client) = request.client {
                appointment.client = client;
            }
            if request.case_ref.is_some() {
                appointment.case_ref = request.case_ref;
            }
            if request.description.is_some() {
                appointment.description = request.description;
            }
            appointment.updated_at = now;

            let updated = self
                .repository
                .replace(appointment)
                .await?
                .ok_or(AppointmentError::NotFound)?;
            (updated, moved)
        };

        if moved {
            let cancelled = self.notifications.cancel_notifications(id).await?;
            info!(
                "Appointment {} moved to {} {}, {} pending reminders cancelled",
                id, updated.date, updated.time, cancelled
            );
        } else {
            info!("Appointment {} updated", id);
        }

        Ok(updated)
    }

    /// Cancels the appointment and every reminder that has not gone out yet.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let _write = self.write_guard.lock().await;
        let appointment = self.transition(id, AppointmentStatus::Cancelled).await?;
        let cancelled = self.notifications.cancel_notifications(id).await?;
        info!("Appointment {} cancelled, {} pending reminders cancelled", id, cancelled);
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn complete_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let _write = self.write_guard.lock().await;
        let appointment = self.transition(id, AppointmentStatus::Completed).await?;
        info!("Appointment {} completed", id);
        Ok(appointment)
    }

    /// Hard delete. Returns `false` when there was nothing to delete.
    #[instrument(skip(self))]
    pub async fn delete_appointment(&self, id: Uuid) -> Result<bool, AppointmentError> {
        let _write = self.write_guard.lock().await;
        let deleted = self.repository.delete(id).await?;
        if deleted {
            let cancelled = self.notifications.cancel_notifications(id).await?;
            info!("Appointment {} deleted, {} pending reminders cancelled", id, cancelled);
        }
        Ok(deleted)
    }

    pub async fn schedule_reminders(
        &self,
        id: Uuid,
        preferences: &RecipientPreferences,
    ) -> Result<Vec<Notification>, AppointmentError> {
        let _write = self.write_guard.lock().await;
        let appointment = self.get_appointment(id).await?;
        self.lifecycle_service.ensure_modifiable(appointment.status)?;
        Ok(self
            .notifications
            .schedule_reminders(&appointment, preferences)
            .await?)
    }

    pub async fn send_immediate_notification(
        &self,
        id: Uuid,
        template_name: &str,
        recipient: Recipient,
        channel: Channel,
    ) -> Result<SendResult, AppointmentError> {
        let appointment = self.get_appointment(id).await?;
        Ok(self
            .notifications
            .send_immediate_notification(&appointment, template_name, recipient, channel)
            .await?)
    }

    pub async fn list_notifications(&self, id: Uuid) -> Result<Vec<Notification>, AppointmentError> {
        self.get_appointment(id).await?;
        Ok(self.notifications.list_notifications(id).await?)
    }

    /// Callers hold `write_guard`.
    async fn transition(
        &self,
        id: Uuid,
        target: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(id).await?;
        self.lifecycle_service
            .validate_status_transition(current.status, target)?;

        self.repository
            .update_status(id, target, self.clock.now())
            .await?
            .ok_or(AppointmentError::NotFound)
    }
}
