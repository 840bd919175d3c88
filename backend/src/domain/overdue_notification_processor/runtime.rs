//! Port bundle for the overdue notification processor.

use std::sync::Arc;

use crate::domain::ports::{
    DeliveryChannel, NoOpNotificationPassMetrics, NotificationPassMetrics, NotificationRepository,
    OverdueLoanSource,
};

/// Port bundle required by the processor.
#[derive(Clone)]
pub struct OverdueNotificationPorts {
    /// Overdue loan discovery adapter.
    pub loans: Arc<dyn OverdueLoanSource>,
    /// Notification record store.
    pub notifications: Arc<dyn NotificationRepository>,
    /// Reminder delivery adapter.
    pub channel: Arc<dyn DeliveryChannel>,
    /// Pass counters adapter.
    pub metrics: Arc<dyn NotificationPassMetrics>,
}

impl OverdueNotificationPorts {
    /// Bundle ports with metrics disabled.
    pub fn new(
        loans: Arc<dyn OverdueLoanSource>,
        notifications: Arc<dyn NotificationRepository>,
        channel: Arc<dyn DeliveryChannel>,
    ) -> Self {
        Self {
            loans,
            notifications,
            channel,
            metrics: Arc::new(NoOpNotificationPassMetrics),
        }
    }

    /// Replace the metrics adapter.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn NotificationPassMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}
