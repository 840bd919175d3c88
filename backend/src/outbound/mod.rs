//! Outbound adapters implementing domain ports.
//!
//! - `memory`: in-process lending store for local runs and tests.
//! - `persistence`: PostgreSQL store via Diesel.
//! - `delivery`: reminder channels (log simulator, HTTP email gateway).
//! - `metrics`: Prometheus counters, behind the `metrics` feature.

pub mod delivery;
pub mod memory;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
