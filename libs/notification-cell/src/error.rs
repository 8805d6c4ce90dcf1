use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

use crate::models::{Channel, NotificationStatus};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Notification not found: {0}")]
    NotificationNotFound(Uuid),

    #[error("Invalid notification status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: NotificationStatus,
        to: NotificationStatus,
    },

    #[error("No provider registered for channel {0}")]
    ProviderNotRegistered(Channel),

    #[error("Recipient of type {recipient} cannot be used on channel {channel}")]
    RecipientChannelMismatch { channel: Channel, recipient: Channel },

    #[error("Invalid notification configuration: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl NotificationError {
    /// Rejections the caller caused, as opposed to infrastructure failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NotificationError::TemplateNotFound(_)
                | NotificationError::RecipientChannelMismatch { .. }
                | NotificationError::InvalidStatusTransition { .. }
        )
    }
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotificationNotFound(_) => AppError::NotFound(err.to_string()),
            e if e.is_validation() => AppError::ValidationError(e.to_string()),
            NotificationError::Store(e) => AppError::Database(e.to_string()),
            e => AppError::Internal(e.to_string()),
        }
    }
}
