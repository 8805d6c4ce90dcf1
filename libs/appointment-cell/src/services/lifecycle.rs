// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::appointment::AppointmentStatus;

use crate::models::AppointmentError;

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Rescheduled,
            ],
            AppointmentStatus::Rescheduled => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Field edits are only accepted while the appointment is still open.
    pub fn ensure_modifiable(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        if current_status.is_terminal() {
            return Err(AppointmentError::NotModifiable(current_status));
        }
        Ok(())
    }

    /// Status after moving an open appointment to a new slot.
    pub fn status_after_move(&self, current_status: AppointmentStatus) -> AppointmentStatus {
        match current_status {
            AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled => AppointmentStatus::Rescheduled,
            terminal => terminal,
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn open_appointments_can_close() {
        let lifecycle = AppointmentLifecycleService::new();
        for from in [AppointmentStatus::Scheduled, AppointmentStatus::Rescheduled] {
            assert!(lifecycle
                .validate_status_transition(from, AppointmentStatus::Completed)
                .is_ok());
            assert!(lifecycle
                .validate_status_transition(from, AppointmentStatus::Cancelled)
                .is_ok());
        }
    }

    #[test]
    fn terminal_states_are_final() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_status_transition(AppointmentStatus::Cancelled, AppointmentStatus::Completed),
            Err(AppointmentError::InvalidStatusTransition {
                from: AppointmentStatus::Cancelled,
                to: AppointmentStatus::Completed
            })
        );
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Completed, AppointmentStatus::Completed)
            .is_err());
        assert_matches!(
            lifecycle.ensure_modifiable(AppointmentStatus::Completed),
            Err(AppointmentError::NotModifiable(AppointmentStatus::Completed))
        );
    }

    #[test]
    fn moving_marks_rescheduled() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_eq!(
            lifecycle.status_after_move(AppointmentStatus::Scheduled),
            AppointmentStatus::Rescheduled
        );
        assert_eq!(
            lifecycle.status_after_move(AppointmentStatus::Rescheduled),
            AppointmentStatus::Rescheduled
        );
    }
}
