use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::{error, info};

use shared_models::error::AppError;

use crate::services::notification::NotificationService;

/// Run one batch of due notifications now, outside the periodic schedule.
pub async fn process_queue(
    State(service): State<Arc<NotificationService>>,
) -> Result<Json<Value>, AppError> {
    info!("Manual notification queue run requested");

    let summary = service.process_notification_queue().await.map_err(|e| {
        error!("Manual queue run failed: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(json!({
        "success": true,
        "data": summary,
    })))
}

/// Notification counts by status.
pub async fn get_queue_stats(
    State(service): State<Arc<NotificationService>>,
) -> Result<Json<Value>, AppError> {
    let stats = service.queue_stats().await?;

    Ok(Json(json!({
        "success": true,
        "data": stats,
    })))
}
