//! Driven port for discovering overdue, unreturned loans.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::OverdueLoan;

define_port_error! {
    /// Errors raised while querying the loan book.
    pub enum OverdueLoanSourceError {
        /// Loan store connection could not be established.
        Connection { message: String } =>
            "loan source connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "loan source query failed: {message}",
    }
}

/// Port supplying the loans that currently warrant a reminder.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverdueLoanSource: Send + Sync {
    /// Loans with no return timestamp whose due time is before `now`.
    async fn overdue_unreturned_loans(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<OverdueLoan>, OverdueLoanSourceError>;
}
