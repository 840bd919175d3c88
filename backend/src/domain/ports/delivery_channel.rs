//! Driven port for delivering overdue reminders to patrons.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{DeliveryContext, NotificationId};

/// One reminder ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    /// Record being delivered; usable as an idempotency key by channels.
    pub notification_id: NotificationId,
    /// Address the reminder is sent to.
    pub recipient_email: String,
    /// Patron display name.
    pub recipient_name: String,
    /// Title of the borrowed item.
    pub item_title: String,
    /// Missed due time.
    pub due_at: DateTime<Utc>,
}

impl DeliveryRequest {
    /// Pair a record identifier with its resolved context.
    pub fn new(notification_id: NotificationId, context: DeliveryContext) -> Self {
        let DeliveryContext {
            recipient_email,
            recipient_name,
            item_title,
            due_at,
        } = context;
        Self {
            notification_id,
            recipient_email,
            recipient_name,
            item_title,
            due_at,
        }
    }
}

/// Result of a delivery attempt that reached the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The channel accepted the reminder.
    Delivered,
    /// The channel answered but did not accept the reminder.
    Declined,
}

define_port_error! {
    /// Errors raised by delivery channels.
    pub enum DeliveryChannelError {
        /// The channel could not be reached.
        Transport { message: String } =>
            "delivery transport failed: {message}",
        /// The channel did not answer in time.
        Timeout { message: String } =>
            "delivery timed out: {message}",
        /// The channel refused the request as malformed or unauthorised.
        Rejected { message: String } =>
            "delivery rejected: {message}",
    }
}

/// Port for the outbound reminder channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Attempt to deliver one reminder.
    async fn deliver(
        &self,
        request: &DeliveryRequest,
    ) -> Result<DeliveryOutcome, DeliveryChannelError>;
}
