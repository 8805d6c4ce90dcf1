// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::booking::AppointmentBookingService;

pub fn appointment_routes(service: Arc<AppointmentBookingService>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment).get(handlers::list_appointments))
        .route("/range", get(handlers::list_appointments_by_date_range))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        // Appointment-scoped notifications
        .route("/{appointment_id}/reminders", post(handlers::schedule_reminders))
        .route("/{appointment_id}/notify", post(handlers::send_notification))
        .route("/{appointment_id}/notifications", get(handlers::list_notifications))
        .with_state(service)
}
