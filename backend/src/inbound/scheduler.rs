//! Periodic driver for overdue notification passes.
//!
//! The scheduler owns a single tokio task that runs one pass, waits, and runs
//! the next. Passes never overlap. After a failed pass the wait shortens to
//! the error backoff so a recovering store is picked up quickly.
//!
//! ```rust,ignore
//! let handle = OverdueNotificationScheduler::new(processor, SchedulerConfig::default()).start();
//! // ...
//! let report = handle.stop().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::{OverdueNotificationProcessor, ShutdownSignal, ShutdownTrigger};

/// Default wait between successful passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Default wait after a failed pass.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// Scheduler timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Wait between passes that completed.
    pub interval: Duration,
    /// Wait after a pass that aborted.
    pub error_backoff: Duration,
    /// Run the first pass at start instead of after one interval.
    pub run_immediately: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            run_immediately: true,
        }
    }
}

/// Pass counts accumulated over a scheduler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Passes that returned a summary, including interrupted ones.
    pub passes_completed: u64,
    /// Passes aborted by a collaborator failure.
    pub passes_failed: u64,
}

/// Raised when the scheduler task cannot be joined.
#[derive(Debug, Error)]
#[error("notification scheduler task failed: {0}")]
pub struct SchedulerStopError(#[from] tokio::task::JoinError);

/// Periodic pass driver.
pub struct OverdueNotificationScheduler {
    processor: Arc<OverdueNotificationProcessor>,
    config: SchedulerConfig,
}

impl OverdueNotificationScheduler {
    /// Build a scheduler around a shared processor.
    pub fn new(processor: Arc<OverdueNotificationProcessor>, config: SchedulerConfig) -> Self {
        Self { processor, config }
    }

    /// Spawn the driving loop on the current tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (trigger, signal) = ShutdownSignal::channel();
        info!(
            interval_secs = self.config.interval.as_secs(),
            error_backoff_secs = self.config.error_backoff.as_secs(),
            run_immediately = self.config.run_immediately,
            "notification scheduler started"
        );
        let task = tokio::spawn(run_loop(self.processor, self.config, signal));
        SchedulerHandle { trigger, task }
    }
}

/// Owner of a running scheduler.
pub struct SchedulerHandle {
    trigger: ShutdownTrigger,
    task: JoinHandle<SchedulerReport>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the loop to exit.
    ///
    /// A pass in progress finishes the record it is delivering and then
    /// returns early.
    pub async fn stop(self) -> Result<SchedulerReport, SchedulerStopError> {
        self.trigger.trigger();
        let report = self.task.await?;
        info!(
            passes_completed = report.passes_completed,
            passes_failed = report.passes_failed,
            "notification scheduler stopped"
        );
        Ok(report)
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run_loop(
    processor: Arc<OverdueNotificationProcessor>,
    config: SchedulerConfig,
    mut signal: ShutdownSignal,
) -> SchedulerReport {
    let mut report = SchedulerReport::default();
    let mut wait = if config.run_immediately {
        Duration::ZERO
    } else {
        config.interval
    };

    loop {
        tokio::select! {
            biased;
            () = signal.triggered() => break,
            () = tokio::time::sleep(wait) => {}
        }

        match processor.process_once_until(&signal).await {
            Ok(_) => {
                report.passes_completed = report.passes_completed.saturating_add(1);
                wait = config.interval;
            }
            Err(err) => {
                report.passes_failed = report.passes_failed.saturating_add(1);
                error!(
                    error = %err,
                    retry_in_secs = config.error_backoff.as_secs(),
                    "scheduled notification pass failed"
                );
                wait = config.error_backoff;
            }
        }

        if signal.is_triggered() {
            break;
        }
    }
    report
}
