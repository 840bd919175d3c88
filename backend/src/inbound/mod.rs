//! Inbound adapters that drive the domain: the periodic scheduler and the
//! HTTP surface for manual triggers, inspection, and health probes.

pub mod http;
pub mod scheduler;
