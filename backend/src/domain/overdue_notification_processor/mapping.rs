//! Mapping helpers for store failures and delivery results.

use std::time::Duration;

use tokio::time::error::Elapsed;

use crate::domain::Error;
use crate::domain::ports::{
    DeliveryChannelError, DeliveryOutcome, NotificationRepositoryError, OverdueLoanSourceError,
};

use super::attempt::AttemptOutcome;

pub(super) const MISSING_CONTEXT_MESSAGE: &str = "delivery context unavailable";
pub(super) const DECLINED_MESSAGE: &str = "delivery channel declined the notification";

pub(super) fn map_loan_source_error(error: OverdueLoanSourceError) -> Error {
    match error {
        OverdueLoanSourceError::Connection { message } => {
            Error::service_unavailable(format!("overdue loan discovery unavailable: {message}"))
        }
        OverdueLoanSourceError::Query { message } => {
            Error::internal(format!("overdue loan discovery failed: {message}"))
        }
    }
}

pub(super) fn map_repository_error(error: NotificationRepositoryError) -> Error {
    match error {
        NotificationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("notification store unavailable: {message}"))
        }
        other => Error::internal(format!("notification store failed: {other}")),
    }
}

pub(super) fn map_delivery_result(
    result: Result<Result<DeliveryOutcome, DeliveryChannelError>, Elapsed>,
    timeout: Duration,
) -> AttemptOutcome {
    match result {
        Ok(Ok(DeliveryOutcome::Delivered)) => AttemptOutcome::Delivered,
        Ok(Ok(DeliveryOutcome::Declined)) => AttemptOutcome::failed(DECLINED_MESSAGE),
        Ok(Err(error)) => AttemptOutcome::failed(error.to_string()),
        Err(_) => AttemptOutcome::failed(format!(
            "delivery timed out after {}s",
            timeout.as_secs()
        )),
    }
}
