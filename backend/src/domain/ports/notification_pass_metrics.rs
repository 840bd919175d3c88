//! Domain port surface for processing pass counters.
//!
//! Keeps pass observability at the domain boundary so adapters can export
//! Prometheus counters without leaking into processor orchestration.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::ProcessingSummary;

define_port_error! {
    /// Errors exposed when recording pass metrics.
    pub enum NotificationPassMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } =>
            "notification metrics exporter failed: {message}",
    }
}

/// Metrics recording port for processing passes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPassMetrics: Send + Sync {
    /// Record a pass that ran to completion or was interrupted cleanly.
    async fn record_pass(
        &self,
        summary: &ProcessingSummary,
    ) -> Result<(), NotificationPassMetricsError>;

    /// Record a pass aborted by a collaborator failure.
    async fn record_pass_failure(&self) -> Result<(), NotificationPassMetricsError>;
}

/// No-op implementation used when metrics are disabled or in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotificationPassMetrics;

#[async_trait]
impl NotificationPassMetrics for NoOpNotificationPassMetrics {
    async fn record_pass(
        &self,
        _summary: &ProcessingSummary,
    ) -> Result<(), NotificationPassMetricsError> {
        Ok(())
    }

    async fn record_pass_failure(&self) -> Result<(), NotificationPassMetricsError> {
        Ok(())
    }
}
