//! HTTP inbound adapter exposing the manual trigger, inspection endpoints,
//! and health probes.

use actix_web::web;

pub mod error;
pub mod health;
pub mod notifications;
pub mod schemas;
pub mod state;

pub use error::ApiResult;

/// Register the versioned API under `/api/v1`.
///
/// Health probes are mounted separately at the root.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(notifications::process_overdue)
            .service(notifications::list_notifications)
            .service(notifications::get_notification_for_loan),
    );
}
