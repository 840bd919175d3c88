//! Display data needed to address an overdue reminder.

use chrono::{DateTime, Utc};

/// Recipient and loan details joined from the patron, book, and loan behind a
/// notification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryContext {
    /// Address the reminder is sent to.
    pub recipient_email: String,
    /// Patron display name.
    pub recipient_name: String,
    /// Title of the borrowed item.
    pub item_title: String,
    /// Missed due time.
    pub due_at: DateTime<Utc>,
}
