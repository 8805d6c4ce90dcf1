use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::notification::NotificationService;

pub fn notification_routes(service: Arc<NotificationService>) -> Router {
    Router::new()
        .route("/process", post(handlers::process_queue))
        .route("/stats", get(handlers::get_queue_stats))
        .with_state(service)
}
