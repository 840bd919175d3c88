//! Overdue loan notification service.
//!
//! Discovers unreturned loans past their due date, creates one reminder
//! record per loan, dispatches reminders through a delivery channel, and
//! retries failures on a backoff schedule. Driven periodically by the
//! scheduler or on demand over HTTP.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(test)]
pub(crate) mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
