//! Prometheus-backed implementations of the domain metrics ports.
//!
//! Compiled only with the `metrics` feature.

mod prometheus_notification_passes;

pub use prometheus_notification_passes::PrometheusNotificationPassMetrics;
