// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use notification_cell::{ImmediateNotificationRequest, RecipientPreferences};
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentFilters, CreateAppointmentRequest, DateRangeQuery,
    UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

/// System failures are logged here; validation and not-found pass through quietly.
fn into_app_error(err: AppointmentError) -> AppError {
    if !err.is_validation() && !matches!(err, AppointmentError::NotFound) {
        error!("Appointment operation failed: {}", err);
    }
    err.into()
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = service
        .create_appointment(request)
        .await
        .map_err(into_app_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

pub async fn list_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    filters: Result<Query<AppointmentFilters>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(filters) = filters?;
    let appointments = service
        .list_appointments(&filters)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "data": appointments,
        "total": appointments.len()
    })))
}

pub async fn list_appointments_by_date_range(
    State(service): State<Arc<AppointmentBookingService>>,
    range: Result<Query<DateRangeQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(range) = range?;
    let appointments = service
        .list_appointments_by_date_range(range.start, range.end)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "data": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service
        .get_appointment(appointment_id)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({ "success": true, "data": appointment })))
}

pub async fn update_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service
        .update_appointment(appointment_id, request)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "data": appointment,
        "message": "Appointment updated successfully"
    })))
}

pub async fn cancel_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service
        .cancel_appointment(appointment_id)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "data": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

pub async fn complete_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service
        .complete_appointment(appointment_id)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "data": appointment,
        "message": "Appointment completed"
    })))
}

pub async fn delete_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let deleted = service
        .delete_appointment(appointment_id)
        .await
        .map_err(into_app_error)?;

    if !deleted {
        return Err(AppError::NotFound("Appointment not found".to_string()));
    }

    info!("Appointment {} deleted via API", appointment_id);
    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted successfully"
    })))
}

// ==============================================================================
// NOTIFICATION HANDLERS
// ==============================================================================

pub async fn schedule_reminders(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
    Json(preferences): Json<RecipientPreferences>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let notifications = service
        .schedule_reminders(appointment_id, &preferences)
        .await
        .map_err(into_app_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": notifications,
            "total": notifications.len()
        })),
    ))
}

pub async fn send_notification(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ImmediateNotificationRequest>,
) -> Result<Json<Value>, AppError> {
    let result = service
        .send_immediate_notification(
            appointment_id,
            &request.template_name,
            request.recipient,
            request.channel,
        )
        .await
        .map_err(into_app_error)?;

    // Delivery failures are reported in the body; the request itself succeeded.
    Ok(Json(json!({
        "success": result.success,
        "data": result
    })))
}

pub async fn list_notifications(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let notifications = service
        .list_notifications(appointment_id)
        .await
        .map_err(into_app_error)?;

    Ok(Json(json!({
        "success": true,
        "data": notifications,
        "total": notifications.len()
    })))
}
