use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::appointment::hhmm;

use crate::models::AppointmentError;
use crate::repository::AppointmentRepository;

pub struct ConflictDetectionService {
    repository: Arc<dyn AppointmentRepository>,
}

impl ConflictDetectionService {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// Whether another active appointment already holds this exact slot.
    pub async fn has_conflict(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        debug!("Checking conflicts for slot {} {}", date, time.format(hhmm::FORMAT));
        self.repository
            .has_conflict(date, time, exclude_appointment_id)
            .await
    }

    /// Like `has_conflict`, but a taken slot becomes a `SlotConflict` rejection.
    pub async fn ensure_slot_free(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        if self.has_conflict(date, time, exclude_appointment_id).await? {
            let time = time.format(hhmm::FORMAT).to_string();
            warn!("Conflict detected for slot {} {}", date, time);
            return Err(AppointmentError::SlotConflict { date, time });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::TestAppointment;

    use crate::repository::InMemoryAppointmentRepository;

    #[tokio::test]
    async fn occupied_slot_is_rejected_except_for_itself() {
        let repo = Arc::new(InMemoryAppointmentRepository::new());
        let existing = repo
            .insert(TestAppointment::in_hours(30).to_appointment())
            .await
            .unwrap();
        let checker = ConflictDetectionService::new(repo);

        assert_matches!(
            checker.ensure_slot_free(existing.date, existing.time, None).await,
            Err(AppointmentError::SlotConflict { time, .. }) if time == "15:00"
        );
        assert!(checker
            .ensure_slot_free(existing.date, existing.time, Some(existing.id))
            .await
            .is_ok());
    }
}
