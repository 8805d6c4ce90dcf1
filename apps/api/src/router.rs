use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, AppointmentBookingService, InMemoryAppointmentRepository};
use notification_cell::{
    notification_routes, InMemoryNotificationRepository, NotificationService, NotificationSettings,
    ProviderRegistry, TemplateCatalog,
};
use shared_config::AppConfig;
use shared_utils::clock::{Clock, SystemClock};

/// Services shared by the HTTP routes and the queue processor.
pub struct AppServices {
    pub notifications: Arc<NotificationService>,
    pub booking: Arc<AppointmentBookingService>,
}

impl AppServices {
    pub fn build(config: &AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let notifications = Arc::new(NotificationService::new(
            Arc::new(InMemoryNotificationRepository::new()),
            Arc::new(ProviderRegistry::simulated(config)),
            Arc::new(TemplateCatalog::default()),
            NotificationSettings::from_config(config),
            Arc::clone(&clock),
        ));
        let booking = Arc::new(AppointmentBookingService::new(
            Arc::new(InMemoryAppointmentRepository::new()),
            Arc::clone(&notifications),
            clock,
        ));

        Self {
            notifications,
            booking,
        }
    }
}

pub fn create_router(services: &AppServices) -> Router {
    Router::new()
        .route("/", get(|| async { "Appointment scheduler API is running!" }))
        .nest("/appointments", appointment_routes(Arc::clone(&services.booking)))
        .nest("/notifications", notification_routes(Arc::clone(&services.notifications)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn mounts_both_cells() {
        let config = AppConfig::default().reliable_delivery();
        let services = AppServices::build(&config);
        assert!(services.notifications.validate_configuration().is_ok());

        let (status, body) = get_json(create_router(&services), "/appointments").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);

        let (status, body) = get_json(create_router(&services), "/notifications/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pending"], 0);
    }
}
