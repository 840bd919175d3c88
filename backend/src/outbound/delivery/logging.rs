//! Delivery channel that writes reminders to the log.
//!
//! Used for local runs and demos. Latency and a failure rate can be simulated
//! so the retry schedule is observable without a real mail relay.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use super::{REMINDER_SUBJECT, render_reminder};
use crate::domain::ports::{
    DeliveryChannel, DeliveryChannelError, DeliveryOutcome, DeliveryRequest,
};

/// Logs each reminder and reports it delivered, unless a simulated failure fires.
#[derive(Debug)]
pub struct LoggingDeliveryChannel {
    failure_rate: f64,
    latency: Option<Duration>,
    rng: Mutex<SmallRng>,
}

impl Default for LoggingDeliveryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingDeliveryChannel {
    /// A channel that always succeeds immediately.
    pub fn new() -> Self {
        Self {
            failure_rate: 0.0,
            latency: None,
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }

    /// Fail this fraction of deliveries; values outside `0.0..=1.0` are clamped.
    #[must_use]
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = if failure_rate.is_finite() {
            failure_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Sleep this long before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency).filter(|value| !value.is_zero());
        self
    }

    /// Seed the failure draw for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(SmallRng::seed_from_u64(seed));
        self
    }

    /// Configured failure fraction.
    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    fn should_fail(&self) -> Result<bool, DeliveryChannelError> {
        if self.failure_rate <= 0.0 {
            return Ok(false);
        }
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| DeliveryChannelError::transport("failure simulator lock poisoned"))?;
        Ok(rng.gen_bool(self.failure_rate))
    }
}

#[async_trait]
impl DeliveryChannel for LoggingDeliveryChannel {
    async fn deliver(
        &self,
        request: &DeliveryRequest,
    ) -> Result<DeliveryOutcome, DeliveryChannelError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.should_fail()? {
            warn!(
                notification_id = %request.notification_id,
                recipient = %request.recipient_email,
                "simulated delivery failure"
            );
            return Err(DeliveryChannelError::transport("simulated delivery failure"));
        }

        info!(
            notification_id = %request.notification_id,
            recipient = %request.recipient_email,
            recipient_name = %request.recipient_name,
            item_title = %request.item_title,
            due_at = %request.due_at,
            subject = REMINDER_SUBJECT,
            body = %render_reminder(request),
            "overdue reminder delivered to log"
        );
        Ok(DeliveryOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};

    use crate::domain::{DeliveryContext, NotificationId};

    #[fixture]
    fn request() -> DeliveryRequest {
        DeliveryRequest::new(
            NotificationId::random(),
            DeliveryContext {
                recipient_email: "john.doe@example.com".to_owned(),
                recipient_name: "John Doe".to_owned(),
                item_title: "Clean Code".to_owned(),
                due_at: Utc
                    .with_ymd_and_hms(2026, 1, 5, 17, 0, 0)
                    .single()
                    .expect("valid time"),
            },
        )
    }

    #[rstest]
    #[tokio::test]
    async fn delivers_by_default(request: DeliveryRequest) {
        let channel = LoggingDeliveryChannel::new();
        let outcome = channel.deliver(&request).await.expect("delivered");
        assert_eq!(outcome, DeliveryOutcome::Delivered);
    }

    #[rstest]
    #[tokio::test]
    async fn full_failure_rate_always_fails(request: DeliveryRequest) {
        let channel = LoggingDeliveryChannel::new()
            .with_failure_rate(1.0)
            .with_seed(7);
        for _ in 0..5 {
            let err = channel.deliver(&request).await.expect_err("simulated");
            assert!(matches!(err, DeliveryChannelError::Transport { .. }));
        }
    }

    #[rstest]
    #[case(-0.5, 0.0)]
    #[case(0.25, 0.25)]
    #[case(3.0, 1.0)]
    #[case(f64::NAN, 0.0)]
    fn failure_rate_is_clamped(#[case] input: f64, #[case] expected: f64) {
        let channel = LoggingDeliveryChannel::new().with_failure_rate(input);
        assert!((channel.failure_rate() - expected).abs() < f64::EPSILON);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn simulated_latency_delays_the_answer(request: DeliveryRequest) {
        let channel = LoggingDeliveryChannel::new().with_latency(Duration::from_secs(2));
        let started = tokio::time::Instant::now();

        channel.deliver(&request).await.expect("delivered");

        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
