//! Prometheus adapter for overdue notification pass counters.

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::ProcessingSummary;
use crate::domain::ports::{NotificationPassMetrics, NotificationPassMetricsError};

/// Prometheus-backed recorder for pass outcomes and per-record counts.
pub struct PrometheusNotificationPassMetrics {
    passes_total: IntCounterVec,
    notifications_total: IntCounterVec,
}

impl PrometheusNotificationPassMetrics {
    /// Create and register counters with the provided registry.
    ///
    /// # Errors
    ///
    /// Returns an error when Prometheus rejects metric registration.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let passes_total = IntCounterVec::new(
            Opts::new(
                "notification_passes_total",
                "Overdue notification passes by status",
            ),
            &["status"],
        )?;
        let notifications_total = IntCounterVec::new(
            Opts::new(
                "notifications_total",
                "Overdue notification records by pass outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(passes_total.clone()))?;
        registry.register(Box::new(notifications_total.clone()))?;
        Ok(Self {
            passes_total,
            notifications_total,
        })
    }

    fn add(&self, outcome: &str, count: u32) {
        if count > 0 {
            self.notifications_total
                .with_label_values(&[outcome])
                .inc_by(u64::from(count));
        }
    }
}

#[async_trait]
impl NotificationPassMetrics for PrometheusNotificationPassMetrics {
    async fn record_pass(
        &self,
        summary: &ProcessingSummary,
    ) -> Result<(), NotificationPassMetricsError> {
        let status = if summary.interrupted {
            "interrupted"
        } else {
            "completed"
        };
        self.passes_total.with_label_values(&[status]).inc();
        self.add("created", summary.notifications_created);
        self.add("sent", summary.notifications_sent);
        self.add("failed", summary.notifications_failed);
        self.add("retried", summary.retries_attempted);
        self.add("invariant_violation", summary.invariant_violations);
        Ok(())
    }

    async fn record_pass_failure(&self) -> Result<(), NotificationPassMetricsError> {
        self.passes_total.with_label_values(&["failed"]).inc();
        Ok(())
    }
}
