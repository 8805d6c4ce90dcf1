pub mod models;
pub mod repository;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use repository::*;
pub use services::*;
pub use router::appointment_routes;
