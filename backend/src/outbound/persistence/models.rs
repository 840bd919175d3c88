//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{loans, overdue_notifications};

/// Overdue loan projection read during discovery.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = loans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OverdueLoanRow {
    pub id: Uuid,
    pub patron_id: Uuid,
    pub due_at: DateTime<Utc>,
}

/// Row struct for reading from the `overdue_notifications` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = overdue_notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub patron_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
}

/// Insertable struct for new notification records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = overdue_notifications)]
pub(crate) struct NewNotificationRow<'a> {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub patron_id: Uuid,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<&'a str>,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
}

/// Full-state changeset for an existing notification record.
///
/// `treat_none_as_null` clears `error_message` and `next_retry_at` when a
/// retry succeeds.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = overdue_notifications)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct NotificationUpdate<'a> {
    pub status: &'a str,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<&'a str>,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
}

/// Joined loan, patron, and book columns for reminder rendering.
#[derive(Debug, Clone, Queryable)]
pub(crate) struct DeliveryContextRow {
    pub email: String,
    pub full_name: String,
    pub title: String,
    pub due_at: DateTime<Utc>,
}
