//! Overdue notification record and its delivery state machine.
//!
//! A record is created `Pending` for each overdue loan. Delivery attempts move
//! it to `Sent` (terminal) or `Failed`; eligible failures are reset to
//! `Pending` for another attempt. Transitions that would break the invariants
//! below are rejected with [`NotificationTransitionError`] rather than applied.
//!
//! ## Invariants
//! - `Sent` ⇒ `sent_at` is set and `error_message`/`next_retry_at` are empty.
//! - `Failed` ⇒ `error_message` and `next_retry_at` are set.
//! - `retry_count` never decreases.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{LoanId, NotificationId, PatronId};
use super::retry_policy::RetryPolicy;

const FALLBACK_FAILURE_REASON: &str = "delivery failed";

/// Delivery status of a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Awaiting a delivery attempt.
    Pending,
    /// Delivered; terminal.
    Sent,
    /// Last attempt failed; may be retried while eligible.
    Failed,
}

impl NotificationStatus {
    /// Stable storage and wire tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a status tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown notification status `{0}`")]
pub struct ParseNotificationStatusError(pub String);

impl FromStr for NotificationStatus {
    type Err = ParseNotificationStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseNotificationStatusError(value.to_owned())),
        }
    }
}

/// Plain field bundle used to move records in and out of storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSnapshot {
    /// Record identifier.
    pub id: NotificationId,
    /// Triggering loan.
    pub loan_id: LoanId,
    /// Borrower to notify.
    pub patron_id: PatronId,
    /// Delivery status.
    pub status: NotificationStatus,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Successful delivery instant.
    pub sent_at: Option<DateTime<Utc>>,
    /// Last failure reason.
    pub error_message: Option<String>,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// Earliest next retry.
    pub next_retry_at: Option<DateTime<Utc>>,
}

/// Stored state that violates the record invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationSnapshotError {
    /// `Sent` without a delivery timestamp.
    #[error("notification {id} is sent but has no sent_at")]
    SentWithoutTimestamp {
        /// Offending record.
        id: NotificationId,
    },
    /// `Sent` while still carrying failure bookkeeping.
    #[error("notification {id} is sent but still carries retry state")]
    SentWithRetryState {
        /// Offending record.
        id: NotificationId,
    },
    /// `Failed` without a reason or retry time.
    #[error("notification {id} is failed but lacks an error message or retry time")]
    FailedWithoutRetryState {
        /// Offending record.
        id: NotificationId,
    },
    /// Not `Sent` but carrying a delivery timestamp.
    #[error("notification {id} is {status} but has sent_at")]
    UnsentWithTimestamp {
        /// Offending record.
        id: NotificationId,
        /// Stored status.
        status: NotificationStatus,
    },
}

/// Why a record may not be reset for another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryIneligibility {
    /// Only failed records are retried.
    NotFailed(NotificationStatus),
    /// The failed-attempt budget is spent.
    Exhausted {
        /// Failed attempts so far.
        retry_count: u32,
        /// Configured cap.
        max_attempts: u32,
    },
    /// The backoff window has not elapsed.
    Scheduled(DateTime<Utc>),
}

impl fmt::Display for RetryIneligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFailed(status) => write!(f, "status is {status}"),
            Self::Exhausted {
                retry_count,
                max_attempts,
            } => write!(f, "{retry_count} of {max_attempts} attempts used"),
            Self::Scheduled(at) => write!(f, "next retry scheduled for {}", at.to_rfc3339()),
        }
    }
}

/// A state transition was requested that the record cannot take.
///
/// These are logic faults in the caller, not delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationTransitionError {
    /// The record was already delivered; dispatching it again is a bug.
    #[error("notification {id} has already been sent")]
    AlreadySent {
        /// Offending record.
        id: NotificationId,
    },
    /// Delivery outcomes only apply to pending records.
    #[error("notification {id} is {status}, expected pending")]
    NotPending {
        /// Offending record.
        id: NotificationId,
        /// Current status.
        status: NotificationStatus,
    },
    /// Reset requested for a record that is not retry-eligible.
    #[error("notification {id} is not eligible for retry: {reason}")]
    NotRetryEligible {
        /// Offending record.
        id: NotificationId,
        /// Failed eligibility check.
        reason: RetryIneligibility,
    },
}

/// Per-loan record tracking overdue reminder delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueNotification {
    id: NotificationId,
    loan_id: LoanId,
    patron_id: PatronId,
    status: NotificationStatus,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    retry_count: u32,
    next_retry_at: Option<DateTime<Utc>>,
}

impl OverdueNotification {
    /// Create a pending record for an overdue loan.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use lending_backend::domain::{LoanId, NotificationStatus, OverdueNotification, PatronId};
    ///
    /// let record = OverdueNotification::new(LoanId::random(), PatronId::random(), Utc::now());
    /// assert_eq!(record.status(), NotificationStatus::Pending);
    /// assert_eq!(record.retry_count(), 0);
    /// ```
    pub fn new(loan_id: LoanId, patron_id: PatronId, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::random(),
            loan_id,
            patron_id,
            status: NotificationStatus::Pending,
            created_at: now,
            sent_at: None,
            error_message: None,
            retry_count: 0,
            next_retry_at: None,
        }
    }

    /// Rebuild a record from stored fields, checking the status invariants.
    pub fn rehydrate(snapshot: NotificationSnapshot) -> Result<Self, NotificationSnapshotError> {
        let NotificationSnapshot {
            id,
            loan_id,
            patron_id,
            status,
            created_at,
            sent_at,
            error_message,
            retry_count,
            next_retry_at,
        } = snapshot;

        match status {
            NotificationStatus::Sent if sent_at.is_none() => {
                return Err(NotificationSnapshotError::SentWithoutTimestamp { id });
            }
            NotificationStatus::Sent if error_message.is_some() || next_retry_at.is_some() => {
                return Err(NotificationSnapshotError::SentWithRetryState { id });
            }
            NotificationStatus::Failed if error_message.is_none() || next_retry_at.is_none() => {
                return Err(NotificationSnapshotError::FailedWithoutRetryState { id });
            }
            NotificationStatus::Pending | NotificationStatus::Failed if sent_at.is_some() => {
                return Err(NotificationSnapshotError::UnsentWithTimestamp { id, status });
            }
            _ => {}
        }

        Ok(Self {
            id,
            loan_id,
            patron_id,
            status,
            created_at,
            sent_at,
            error_message,
            retry_count,
            next_retry_at,
        })
    }

    /// Copy the record into a plain field bundle for storage.
    pub fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            id: self.id,
            loan_id: self.loan_id,
            patron_id: self.patron_id,
            status: self.status,
            created_at: self.created_at,
            sent_at: self.sent_at,
            error_message: self.error_message.clone(),
            retry_count: self.retry_count,
            next_retry_at: self.next_retry_at,
        }
    }

    /// Record identifier.
    pub const fn id(&self) -> NotificationId {
        self.id
    }

    /// Triggering loan.
    pub const fn loan_id(&self) -> LoanId {
        self.loan_id
    }

    /// Borrower to notify.
    pub const fn patron_id(&self) -> PatronId {
        self.patron_id
    }

    /// Delivery status.
    pub const fn status(&self) -> NotificationStatus {
        self.status
    }

    /// Creation instant.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Successful delivery instant.
    pub const fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    /// Last failure reason.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Failed attempts so far.
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Earliest next retry.
    pub const fn next_retry_at(&self) -> Option<DateTime<Utc>> {
        self.next_retry_at
    }

    /// Record a successful delivery.
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> Result<(), NotificationTransitionError> {
        self.ensure_pending()?;
        self.status = NotificationStatus::Sent;
        self.sent_at = Some(now);
        self.error_message = None;
        self.next_retry_at = None;
        Ok(())
    }

    /// Record a failed delivery and schedule the next retry.
    pub fn mark_failed(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
        policy: &RetryPolicy,
    ) -> Result<(), NotificationTransitionError> {
        self.ensure_pending()?;
        let reason = reason.into();
        let reason = if reason.trim().is_empty() {
            FALLBACK_FAILURE_REASON.to_owned()
        } else {
            reason
        };

        self.status = NotificationStatus::Failed;
        self.retry_count = self.retry_count.saturating_add(1);
        self.error_message = Some(reason);
        self.next_retry_at = Some(policy.next_retry_at(self.retry_count, now));
        Ok(())
    }

    /// Explain why the record cannot be retried at `now`, if it cannot.
    pub fn retry_ineligibility(
        &self,
        now: DateTime<Utc>,
        policy: &RetryPolicy,
    ) -> Option<RetryIneligibility> {
        if self.status != NotificationStatus::Failed {
            return Some(RetryIneligibility::NotFailed(self.status));
        }
        if policy.is_exhausted(self.retry_count) {
            return Some(RetryIneligibility::Exhausted {
                retry_count: self.retry_count,
                max_attempts: policy.max_attempts,
            });
        }
        match self.next_retry_at {
            Some(at) if at > now => Some(RetryIneligibility::Scheduled(at)),
            _ => None,
        }
    }

    /// Whether the record is failed, under budget, and past its backoff window.
    pub fn is_retry_eligible(&self, now: DateTime<Utc>, policy: &RetryPolicy) -> bool {
        self.retry_ineligibility(now, policy).is_none()
    }

    /// Move an eligible failed record back to pending, keeping `retry_count`.
    pub fn reset_for_retry(
        &mut self,
        now: DateTime<Utc>,
        policy: &RetryPolicy,
    ) -> Result<(), NotificationTransitionError> {
        if let Some(reason) = self.retry_ineligibility(now, policy) {
            return Err(NotificationTransitionError::NotRetryEligible {
                id: self.id,
                reason,
            });
        }
        self.status = NotificationStatus::Pending;
        self.error_message = None;
        self.next_retry_at = None;
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), NotificationTransitionError> {
        match self.status {
            NotificationStatus::Pending => Ok(()),
            NotificationStatus::Sent => Err(NotificationTransitionError::AlreadySent { id: self.id }),
            NotificationStatus::Failed => Err(NotificationTransitionError::NotPending {
                id: self.id,
                status: self.status,
            }),
        }
    }
}

#[cfg(test)]
mod tests;
