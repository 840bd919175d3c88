//! Domain orchestration for overdue loan reminders.
//!
//! One pass runs three steps in order, each completing before the next:
//! discovery creates a pending record for every overdue loan without one,
//! pending dispatch delivers pending records oldest first, and retry dispatch
//! resets and re-delivers failed records whose backoff has elapsed.
//!
//! Per-record delivery failures are absorbed into the record state and the
//! returned [`ProcessingSummary`]. Only store or discovery failures abort a
//! pass.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    DeliveryChannel, DeliveryRequest, NotificationPassMetrics, NotificationRepository,
    NotificationRepositoryError, OverdueLoanSource,
};
use crate::domain::{
    Error, NotificationId, NotificationTransitionError, OverdueNotification, ProcessingSummary,
    RetryPolicy,
};

mod attempt;
mod mapping;
mod runtime;
mod shutdown;

use attempt::AttemptOutcome;
pub use runtime::OverdueNotificationPorts;
pub use shutdown::{ShutdownSignal, ShutdownTrigger};

/// Default upper bound on a single delivery attempt.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Processor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverdueNotificationProcessorConfig {
    /// Backoff schedule and attempt cap for failed deliveries.
    pub retry_policy: RetryPolicy,
    /// Per-attempt delivery timeout; expiry counts as a failure.
    pub delivery_timeout: Duration,
}

impl Default for OverdueNotificationProcessorConfig {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }
}

/// Runs reconciliation-and-dispatch passes over overdue loans.
pub struct OverdueNotificationProcessor {
    loans: Arc<dyn OverdueLoanSource>,
    notifications: Arc<dyn NotificationRepository>,
    channel: Arc<dyn DeliveryChannel>,
    metrics: Arc<dyn NotificationPassMetrics>,
    clock: Arc<dyn Clock>,
    config: OverdueNotificationProcessorConfig,
    pass_lock: Mutex<()>,
}

/// Records already attempted in the current pass.
type Dispatched = HashSet<NotificationId>;

impl OverdueNotificationProcessor {
    /// Build a processor from its ports.
    /// ```rust,ignore
    /// let processor = OverdueNotificationProcessor::new(ports, clock, config);
    /// let summary = processor.process_once().await?;
    /// ```
    pub fn new(
        ports: OverdueNotificationPorts,
        clock: Arc<dyn Clock>,
        config: OverdueNotificationProcessorConfig,
    ) -> Self {
        Self {
            loans: ports.loans,
            notifications: ports.notifications,
            channel: ports.channel,
            metrics: ports.metrics,
            clock,
            config,
            pass_lock: Mutex::new(()),
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &OverdueNotificationProcessorConfig {
        &self.config
    }

    /// Run one full pass.
    ///
    /// Safe to call repeatedly; a second call with nothing new to do reports
    /// no creations and no sends.
    pub async fn process_once(&self) -> Result<ProcessingSummary, Error> {
        self.process_once_until(&ShutdownSignal::never()).await
    }

    /// Run one full pass, stopping between records once `shutdown` fires.
    ///
    /// Concurrent callers queue behind the pass in progress.
    pub async fn process_once_until(
        &self,
        shutdown: &ShutdownSignal,
    ) -> Result<ProcessingSummary, Error> {
        let _pass = self.pass_lock.lock().await;
        info!("overdue notification pass started");

        let mut summary = ProcessingSummary::default();
        match self.run_pass(shutdown, &mut summary).await {
            Ok(()) => {
                info!(
                    overdue_loans_seen = summary.overdue_loans_seen,
                    notifications_created = summary.notifications_created,
                    notifications_sent = summary.notifications_sent,
                    notifications_failed = summary.notifications_failed,
                    retries_attempted = summary.retries_attempted,
                    invariant_violations = summary.invariant_violations,
                    interrupted = summary.interrupted,
                    "overdue notification pass finished"
                );
                self.record_pass_metric(&summary).await;
                Ok(summary)
            }
            Err(err) => {
                error!(
                    error = %err,
                    notifications_sent = summary.notifications_sent,
                    notifications_failed = summary.notifications_failed,
                    "overdue notification pass aborted"
                );
                self.record_pass_failure_metric().await;
                Err(err)
            }
        }
    }

    async fn run_pass(
        &self,
        shutdown: &ShutdownSignal,
        summary: &mut ProcessingSummary,
    ) -> Result<(), Error> {
        self.discover(shutdown, summary).await?;
        if summary.interrupted {
            return Ok(());
        }

        let mut dispatched = Dispatched::new();
        self.dispatch_pending(shutdown, summary, &mut dispatched)
            .await?;
        if summary.interrupted {
            return Ok(());
        }

        self.dispatch_retries(shutdown, summary, &mut dispatched)
            .await
    }

    async fn discover(
        &self,
        shutdown: &ShutdownSignal,
        summary: &mut ProcessingSummary,
    ) -> Result<(), Error> {
        let loans = self
            .loans
            .overdue_unreturned_loans(self.clock.utc())
            .await
            .map_err(mapping::map_loan_source_error)?;
        summary.overdue_loans_seen = saturating_count(loans.len());

        for loan in loans {
            if shutdown.is_triggered() {
                summary.interrupted = true;
                return Ok(());
            }

            let exists = self
                .notifications
                .exists_for_loan(loan.loan_id)
                .await
                .map_err(mapping::map_repository_error)?;
            if exists {
                continue;
            }

            let record = OverdueNotification::new(loan.loan_id, loan.patron_id, self.clock.utc());
            match self.notifications.insert(&record).await {
                Ok(()) => {
                    summary.notifications_created = summary.notifications_created.saturating_add(1);
                    debug!(
                        notification_id = %record.id(),
                        loan_id = %loan.loan_id,
                        "created overdue notification"
                    );
                }
                Err(NotificationRepositoryError::DuplicateLoan { loan_id }) => {
                    debug!(%loan_id, "notification created concurrently; skipping");
                }
                Err(err) => return Err(mapping::map_repository_error(err)),
            }
        }
        Ok(())
    }

    async fn dispatch_pending(
        &self,
        shutdown: &ShutdownSignal,
        summary: &mut ProcessingSummary,
        dispatched: &mut Dispatched,
    ) -> Result<(), Error> {
        let pending = self
            .notifications
            .pending()
            .await
            .map_err(mapping::map_repository_error)?;

        for record in pending {
            if shutdown.is_triggered() {
                summary.interrupted = true;
                return Ok(());
            }
            if !dispatched.insert(record.id()) {
                continue;
            }
            self.dispatch(record, summary).await?;
        }
        Ok(())
    }

    async fn dispatch_retries(
        &self,
        shutdown: &ShutdownSignal,
        summary: &mut ProcessingSummary,
        dispatched: &mut Dispatched,
    ) -> Result<(), Error> {
        let policy = self.config.retry_policy;
        let eligible = self
            .notifications
            .retry_eligible(self.clock.utc(), policy.max_attempts)
            .await
            .map_err(mapping::map_repository_error)?;

        for mut record in eligible {
            if shutdown.is_triggered() {
                summary.interrupted = true;
                return Ok(());
            }
            if dispatched.contains(&record.id()) {
                continue;
            }
            if let Err(violation) = record.reset_for_retry(self.clock.utc(), &policy) {
                report_violation(&violation, summary);
                continue;
            }
            dispatched.insert(record.id());
            summary.retries_attempted = summary.retries_attempted.saturating_add(1);
            self.dispatch(record, summary).await?;
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        mut record: OverdueNotification,
        summary: &mut ProcessingSummary,
    ) -> Result<(), Error> {
        let outcome = self.attempt_delivery(&record).await?;

        let now = self.clock.utc();
        let transition = match &outcome {
            AttemptOutcome::Delivered => record.mark_sent(now),
            AttemptOutcome::Failed(reason) => {
                record.mark_failed(reason.as_str(), now, &self.config.retry_policy)
            }
        };
        if let Err(violation) = transition {
            report_violation(&violation, summary);
            return Ok(());
        }

        self.notifications
            .update(&record)
            .await
            .map_err(mapping::map_repository_error)?;

        match outcome {
            AttemptOutcome::Delivered => {
                summary.notifications_sent = summary.notifications_sent.saturating_add(1);
                info!(
                    notification_id = %record.id(),
                    loan_id = %record.loan_id(),
                    "overdue notification sent"
                );
            }
            AttemptOutcome::Failed(reason) => {
                summary.notifications_failed = summary.notifications_failed.saturating_add(1);
                warn!(
                    notification_id = %record.id(),
                    loan_id = %record.loan_id(),
                    retry_count = record.retry_count(),
                    next_retry_at = ?record.next_retry_at(),
                    reason = %reason,
                    "overdue notification delivery failed"
                );
            }
        }
        Ok(())
    }

    async fn attempt_delivery(&self, record: &OverdueNotification) -> Result<AttemptOutcome, Error> {
        let context = self
            .notifications
            .delivery_context(record)
            .await
            .map_err(mapping::map_repository_error)?;
        let Some(context) = context else {
            return Ok(AttemptOutcome::failed(mapping::MISSING_CONTEXT_MESSAGE));
        };

        let request = DeliveryRequest::new(record.id(), context);
        let timeout = self.config.delivery_timeout;
        let result = tokio::time::timeout(timeout, self.channel.deliver(&request)).await;
        Ok(mapping::map_delivery_result(result, timeout))
    }

    async fn record_pass_metric(&self, summary: &ProcessingSummary) {
        if let Err(err) = self.metrics.record_pass(summary).await {
            warn!(error = %err, "failed to record notification pass metrics");
        }
    }

    async fn record_pass_failure_metric(&self) {
        if let Err(err) = self.metrics.record_pass_failure().await {
            warn!(error = %err, "failed to record notification pass failure metric");
        }
    }
}

fn report_violation(violation: &NotificationTransitionError, summary: &mut ProcessingSummary) {
    summary.invariant_violations = summary.invariant_violations.saturating_add(1);
    error!(error = %violation, "notification transition rejected; record skipped");
}

fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
