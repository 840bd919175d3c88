//! Runtime settings loaded via OrthoConfig.
//!
//! Every value comes from `NOTIFIER_*` environment variables or a config file
//! and falls back to the defaults below. Accessors validate and convert raw
//! values into the typed configuration the processor, scheduler, and server
//! consume.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;

use crate::domain::{DEFAULT_DELIVERY_TIMEOUT, OverdueNotificationProcessorConfig, RetryPolicy};
use crate::inbound::scheduler::{DEFAULT_ERROR_BACKOFF, DEFAULT_INTERVAL, SchedulerConfig};
use crate::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised when a configured value cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A value is present but malformed or out of range.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Environment-facing field name.
        field: &'static str,
        /// What is wrong with the value.
        message: String,
    },
}

impl SettingsError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Configuration values for the overdue notifier.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "NOTIFIER")]
pub struct NotifierSettings {
    /// HTTP listen address.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; the seeded in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Maximum open database connections.
    pub db_pool_size: Option<u32>,
    /// Seconds between scheduled passes.
    pub interval_secs: Option<u64>,
    /// Seconds to wait after a failed pass.
    pub error_backoff_secs: Option<u64>,
    /// Per-delivery timeout in seconds.
    pub delivery_timeout_secs: Option<u64>,
    /// Failed attempts after which a record stops retrying.
    pub max_attempts: Option<u32>,
    /// Email gateway endpoint; reminders are logged when absent.
    pub email_gateway_url: Option<String>,
    /// Fraction of logged deliveries that fail on purpose.
    pub simulated_failure_rate: Option<f64>,
}

fn positive_secs(
    field: &'static str,
    value: Option<u64>,
    default: Duration,
) -> Result<Duration, SettingsError> {
    match value {
        None => Ok(default),
        Some(0) => Err(SettingsError::invalid(field, "must be greater than zero")),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

impl NotifierSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse()
            .map_err(|err| SettingsError::invalid("bind_addr", format!("{raw}: {err}")))
    }

    /// Configured database URL, ignoring blank values.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Connection pool settings when a database is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for a zero pool size.
    pub fn pool_config(&self) -> Result<Option<PoolConfig>, SettingsError> {
        let Some(url) = self.database_url() else {
            return Ok(None);
        };
        let config = PoolConfig::new(url);
        match self.db_pool_size {
            None => Ok(Some(config)),
            Some(0) => Err(SettingsError::invalid(
                "db_pool_size",
                "must be greater than zero",
            )),
            Some(size) => Ok(Some(config.with_max_size(size))),
        }
    }

    /// Parsed email gateway endpoint, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for malformed or non-HTTP URLs.
    pub fn email_gateway_url(&self) -> Result<Option<Url>, SettingsError> {
        let Some(raw) = self
            .email_gateway_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        else {
            return Ok(None);
        };
        let url = Url::parse(raw)
            .map_err(|err| SettingsError::invalid("email_gateway_url", format!("{raw}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::invalid(
                "email_gateway_url",
                format!("unsupported scheme {}", url.scheme()),
            ));
        }
        Ok(Some(url))
    }

    /// Simulated failure fraction for the logging channel.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] outside `0.0..=1.0`.
    pub fn simulated_failure_rate(&self) -> Result<f64, SettingsError> {
        match self.simulated_failure_rate {
            None => Ok(0.0),
            Some(rate) if (0.0..=1.0).contains(&rate) => Ok(rate),
            Some(rate) => Err(SettingsError::invalid(
                "simulated_failure_rate",
                format!("{rate} is outside 0.0..=1.0"),
            )),
        }
    }

    /// Processor configuration derived from the retry and timeout settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for a zero timeout or attempt cap.
    pub fn processor_config(&self) -> Result<OverdueNotificationProcessorConfig, SettingsError> {
        let mut retry_policy = RetryPolicy::default();
        if let Some(max_attempts) = self.max_attempts {
            if max_attempts == 0 {
                return Err(SettingsError::invalid(
                    "max_attempts",
                    "must be greater than zero",
                ));
            }
            retry_policy.max_attempts = max_attempts;
        }
        Ok(OverdueNotificationProcessorConfig {
            retry_policy,
            delivery_timeout: positive_secs(
                "delivery_timeout_secs",
                self.delivery_timeout_secs,
                DEFAULT_DELIVERY_TIMEOUT,
            )?,
        })
    }

    /// Scheduler timing derived from the interval settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for zero durations.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, SettingsError> {
        Ok(SchedulerConfig {
            interval: positive_secs("interval_secs", self.interval_secs, DEFAULT_INTERVAL)?,
            error_backoff: positive_secs(
                "error_backoff_secs",
                self.error_backoff_secs,
                DEFAULT_ERROR_BACKOFF,
            )?,
            ..SchedulerConfig::default()
        })
    }
}
