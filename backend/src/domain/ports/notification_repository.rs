//! Driven port for persisting overdue notification records.
//!
//! The repository owns storage mechanics only. Eligibility rules come from the
//! caller (`now`, `max_attempts`) so adapters filter with the same policy the
//! record itself enforces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{DeliveryContext, LoanId, NotificationStatus, OverdueNotification};

define_port_error! {
    /// Errors raised while reading or writing notification records.
    pub enum NotificationRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "notification store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "notification store query failed: {message}",
        /// A record for the loan already exists.
        DuplicateLoan { loan_id: LoanId } =>
            "a notification already exists for loan {loan_id}",
        /// The record to update does not exist.
        NotFound { message: String } =>
            "notification not found: {message}",
    }
}

/// Port for the notification store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Whether any record exists for `loan_id`.
    async fn exists_for_loan(&self, loan_id: LoanId) -> Result<bool, NotificationRepositoryError>;

    /// Persist a newly created record.
    ///
    /// Implementations reject a second record for the same loan with
    /// [`NotificationRepositoryError::DuplicateLoan`].
    async fn insert(&self, record: &OverdueNotification) -> Result<(), NotificationRepositoryError>;

    /// Pending records, oldest `created_at` first.
    async fn pending(&self) -> Result<Vec<OverdueNotification>, NotificationRepositoryError>;

    /// Failed records with `next_retry_at <= now` and `retry_count < max_attempts`.
    async fn retry_eligible(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<Vec<OverdueNotification>, NotificationRepositoryError>;

    /// Persist the full current state of an existing record.
    async fn update(&self, record: &OverdueNotification) -> Result<(), NotificationRepositoryError>;

    /// Resolve recipient and item details for a record.
    ///
    /// Returns `Ok(None)` when the loan, patron, or book behind the record no
    /// longer resolves.
    async fn delivery_context(
        &self,
        record: &OverdueNotification,
    ) -> Result<Option<DeliveryContext>, NotificationRepositoryError>;

    /// The record for `loan_id`, if any.
    async fn find_by_loan(
        &self,
        loan_id: LoanId,
    ) -> Result<Option<OverdueNotification>, NotificationRepositoryError>;

    /// Records with the given status, or all records, oldest first.
    async fn list(
        &self,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<OverdueNotification>, NotificationRepositoryError>;
}
