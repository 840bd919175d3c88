//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod delivery_channel;
mod notification_pass_metrics;
mod notification_repository;
mod overdue_loan_source;

#[cfg(test)]
pub use delivery_channel::MockDeliveryChannel;
pub use delivery_channel::{
    DeliveryChannel, DeliveryChannelError, DeliveryOutcome, DeliveryRequest,
};
#[cfg(test)]
pub use notification_pass_metrics::MockNotificationPassMetrics;
pub use notification_pass_metrics::{
    NoOpNotificationPassMetrics, NotificationPassMetrics, NotificationPassMetricsError,
};
#[cfg(test)]
pub use notification_repository::MockNotificationRepository;
pub use notification_repository::{NotificationRepository, NotificationRepositoryError};
#[cfg(test)]
pub use overdue_loan_source::MockOverdueLoanSource;
pub use overdue_loan_source::{OverdueLoanSource, OverdueLoanSourceError};
