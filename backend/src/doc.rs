//! OpenAPI documentation for the notifier's HTTP surface.
//!
//! Registers the notification trigger and inspection paths, the health probes,
//! and the schema wrappers that document domain error payloads without
//! coupling domain types to utoipa.

use utoipa::OpenApi;

use crate::inbound::http::notifications::{
    NotificationBody, NotificationListBody, ProcessingSummaryBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

/// OpenAPI document for the REST API.
/// Swagger UI serves it in debug builds only.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending notifier API",
        description = "Manual trigger and inspection of overdue loan reminders, plus health probes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::notifications::process_overdue,
        crate::inbound::http::notifications::list_notifications,
        crate::inbound::http::notifications::get_notification_for_loan,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ProcessingSummaryBody,
        NotificationBody,
        NotificationListBody,
        ErrorSchema,
        ErrorCodeSchema
    )),
    tags(
        (name = "notifications", description = "Overdue loan reminder processing"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
