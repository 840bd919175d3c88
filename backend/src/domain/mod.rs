//! Domain primitives, aggregates, and the overdue notification processor.
//!
//! Purpose: own the notification lifecycle rules independent of storage,
//! transport, and scheduling. Adapters reach the domain only through the
//! traits in [`ports`].
//!
//! Public surface:
//! - `OverdueNotification` with its status, snapshot, and transition errors.
//! - `RetryPolicy` with the canonical backoff schedule.
//! - `Loan`/`OverdueLoan` and the strongly typed identifiers.
//! - `OverdueNotificationProcessor` and its `ProcessingSummary`.
//! - `Error`/`ErrorCode` for whole-pass and request failures.

pub mod delivery_context;
pub mod error;
pub mod ids;
pub mod loan;
pub mod notification;
pub mod overdue_notification_processor;
pub mod ports;
pub mod processing_summary;
pub mod retry_policy;

pub use self::delivery_context::DeliveryContext;
pub use self::error::{Error, ErrorCode};
pub use self::ids::{BookId, LoanId, NotificationId, PatronId};
pub use self::loan::{Loan, OverdueLoan};
pub use self::notification::{
    NotificationSnapshot, NotificationSnapshotError, NotificationStatus,
    NotificationTransitionError, OverdueNotification, ParseNotificationStatusError,
    RetryIneligibility,
};
pub use self::overdue_notification_processor::{
    DEFAULT_DELIVERY_TIMEOUT, OverdueNotificationPorts, OverdueNotificationProcessor,
    OverdueNotificationProcessorConfig, ShutdownSignal, ShutdownTrigger,
};
pub use self::processing_summary::ProcessingSummary;
pub use self::retry_policy::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};
