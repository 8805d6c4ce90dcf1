pub mod providers;
pub mod repository;
pub mod notification;
pub mod worker;

pub use providers::*;
pub use repository::*;
pub use notification::*;
pub use worker::*;
