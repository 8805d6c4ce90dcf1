pub mod models;
pub mod services;
pub mod error;
pub mod templates;
pub mod handlers;
pub mod router;

pub use models::*;
pub use error::*;
pub use services::*;
pub use templates::*;
pub use router::notification_routes;
