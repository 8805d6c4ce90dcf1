use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::Document;

// ==============================================================================
// CHANNELS AND RECIPIENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Push,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Push];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Sms => write!(f, "sms"),
            Channel::Push => write!(f, "push"),
        }
    }
}

/// Channel-specific delivery address. Each variant belongs to exactly one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Recipient {
    Email(String),
    Phone(String),
    PushToken(String),
}

impl Recipient {
    pub fn channel(&self) -> Channel {
        match self {
            Recipient::Email(_) => Channel::Email,
            Recipient::Phone(_) => Channel::Sms,
            Recipient::PushToken(_) => Channel::Push,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Recipient::Email(address) => address,
            Recipient::Phone(number) => number,
            Recipient::PushToken(token) => token,
        }
    }
}

fn default_enabled_types() -> Vec<Channel> {
    vec![Channel::Email]
}

/// How a client wants to be reminded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientPreferences {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub push_token: Option<String>,
    #[serde(default = "default_enabled_types")]
    pub enabled_types: Vec<Channel>,
}

impl Default for RecipientPreferences {
    fn default() -> Self {
        Self {
            email: None,
            phone: None,
            push_token: None,
            enabled_types: default_enabled_types(),
        }
    }
}

impl RecipientPreferences {
    /// The address to use for `channel`, if one was supplied and is not blank.
    pub fn recipient_for(&self, channel: Channel) -> Option<Recipient> {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        match channel {
            Channel::Email => non_blank(&self.email).map(Recipient::Email),
            Channel::Sms => non_blank(&self.phone).map(Recipient::Phone),
            Channel::Push => non_blank(&self.push_token).map(Recipient::PushToken),
        }
    }

    /// Enabled channels in request order, without duplicates.
    pub fn channels(&self) -> Vec<Channel> {
        let mut seen = Vec::with_capacity(self.enabled_types.len());
        for channel in &self.enabled_types {
            if !seen.contains(channel) {
                seen.push(*channel);
            }
        }
        seen
    }
}

// ==============================================================================
// NOTIFICATION RECORD
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    /// Claimed by a running batch; no other batch may attempt it.
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Sent | NotificationStatus::Failed | NotificationStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, target: &NotificationStatus) -> bool {
        use NotificationStatus::*;
        match (self, target) {
            (Pending, Processing) => true,
            (Pending, Cancelled) => true,
            (Processing, Sent) => true,
            (Processing, Failed) => true,
            (Processing, Pending) => true,
            (Processing, Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::Processing => write!(f, "processing"),
            NotificationStatus::Sent => write!(f, "sent"),
            NotificationStatus::Failed => write!(f, "failed"),
            NotificationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub user_id: String,
    pub channel: Channel,
    pub status: NotificationStatus,
    pub scheduled_for: DateTime<Utc>,
    pub template_name: String,
    pub recipient: Recipient,
    pub content: NotificationContent,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(input: NewNotification, now: DateTime<Utc>) -> Self {
        let claimed_at = (input.status == NotificationStatus::Processing).then_some(now);
        Self {
            id: Uuid::new_v4(),
            appointment_id: input.appointment_id,
            user_id: input.user_id,
            channel: input.recipient.channel(),
            status: input.status,
            scheduled_for: input.scheduled_for,
            template_name: input.template_name,
            recipient: input.recipient,
            content: input.content,
            retry_count: 0,
            max_retries: input.max_retries,
            created_at: now,
            updated_at: now,
            sent_at: None,
            error_message: None,
            claimed_at,
        }
    }

    pub fn has_retries_left(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Pending, due and still within its retry budget.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == NotificationStatus::Pending
            && self.scheduled_for <= now
            && self.has_retries_left()
    }

    /// A claim older than `ttl` belongs to a batch that never finished.
    pub fn claim_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.status == NotificationStatus::Processing
            && self.has_retries_left()
            && self.claimed_at.map_or(true, |at| at + ttl <= now)
    }
}

impl Document for Notification {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub appointment_id: Uuid,
    pub user_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub template_name: String,
    pub recipient: Recipient,
    pub content: NotificationContent,
    pub max_retries: u32,
    pub status: NotificationStatus,
}

// ==============================================================================
// DELIVERY AND QUEUE REPORTING
// ==============================================================================

/// Outcome of one delivery attempt. Failures are data, not errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueRunSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub sent: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl QueueStats {
    pub fn record(&mut self, status: NotificationStatus) {
        match status {
            NotificationStatus::Pending => self.pending += 1,
            NotificationStatus::Processing => self.processing += 1,
            NotificationStatus::Sent => self.sent += 1,
            NotificationStatus::Failed => self.failed += 1,
            NotificationStatus::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImmediateNotificationRequest {
    pub template_name: String,
    pub recipient: Recipient,
    pub channel: Channel,
}
