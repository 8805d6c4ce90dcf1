pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod validation;

pub use booking::AppointmentBookingService;
pub use conflict::ConflictDetectionService;
pub use lifecycle::AppointmentLifecycleService;
