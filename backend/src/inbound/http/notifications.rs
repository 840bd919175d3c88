//! Manual trigger and read-only inspection of overdue notifications.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::NotificationRepositoryError;
use crate::domain::{Error, LoanId, NotificationStatus, OverdueNotification, ProcessingSummary};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Counters returned by a manually triggered pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSummaryBody {
    pub overdue_loans_seen: u32,
    pub notifications_created: u32,
    pub notifications_sent: u32,
    pub notifications_failed: u32,
    pub retries_attempted: u32,
    pub invariant_violations: u32,
    pub interrupted: bool,
}

impl From<ProcessingSummary> for ProcessingSummaryBody {
    fn from(value: ProcessingSummary) -> Self {
        Self {
            overdue_loans_seen: value.overdue_loans_seen,
            notifications_created: value.notifications_created,
            notifications_sent: value.notifications_sent,
            notifications_failed: value.notifications_failed,
            retries_attempted: value.retries_attempted,
            invariant_violations: value.invariant_violations,
            interrupted: value.interrupted,
        }
    }
}

/// JSON view of one notification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBody {
    pub id: String,
    pub loan_id: String,
    pub patron_id: String,
    #[schema(example = "failed")]
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<String>,
}

impl From<&OverdueNotification> for NotificationBody {
    fn from(value: &OverdueNotification) -> Self {
        Self {
            id: value.id().to_string(),
            loan_id: value.loan_id().to_string(),
            patron_id: value.patron_id().to_string(),
            status: value.status().as_str().to_owned(),
            created_at: value.created_at().to_rfc3339(),
            sent_at: value.sent_at().map(|at| at.to_rfc3339()),
            error_message: value.error_message().map(str::to_owned),
            retry_count: value.retry_count(),
            next_retry_at: value.next_retry_at().map(|at| at.to_rfc3339()),
        }
    }
}

/// Response payload for notification listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationListBody {
    pub notifications: Vec<NotificationBody>,
}

/// Query parameters for notification listings.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotificationsQuery {
    /// Optional status filter: `pending`, `sent`, or `failed`.
    pub status: Option<String>,
}

fn parse_status(raw: Option<String>) -> Result<Option<NotificationStatus>, Error> {
    raw.map(|value| {
        value.parse::<NotificationStatus>().map_err(|_| {
            Error::invalid_request("status must be one of pending, sent, failed").with_details(
                json!({
                    "field": "status",
                    "value": value,
                    "code": "invalid_status"
                }),
            )
        })
    })
    .transpose()
}

fn parse_loan_id(raw: &str) -> Result<LoanId, Error> {
    raw.parse::<LoanId>().map_err(|_| {
        Error::invalid_request("loan id must be a UUID").with_details(json!({
            "field": "loanId",
            "value": raw,
            "code": "invalid_uuid"
        }))
    })
}

fn map_query_error(error: NotificationRepositoryError) -> Error {
    match error {
        NotificationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("notification store unavailable: {message}"))
        }
        other => Error::internal(format!("notification query failed: {other}")),
    }
}

/// Run one overdue notification pass now and report its counters.
///
/// A pass that ran returns 200 even when some deliveries failed.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/process-overdue",
    responses(
        (status = 200, description = "Pass completed", body = ProcessingSummaryBody),
        (status = 503, description = "Store or loan source unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "processOverdueNotifications"
)]
#[post("/notifications/process-overdue")]
pub async fn process_overdue(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let summary = state.processor.process_once().await?;
    Ok(HttpResponse::Ok().json(ProcessingSummaryBody::from(summary)))
}

/// List notification records, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notification records", body = NotificationListBody),
        (status = 400, description = "Invalid status filter", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "listNotifications"
)]
#[get("/notifications")]
pub async fn list_notifications(
    state: web::Data<HttpState>,
    query: web::Query<ListNotificationsQuery>,
) -> ApiResult<HttpResponse> {
    let status = parse_status(query.into_inner().status)?;
    let records = state
        .notifications
        .list(status)
        .await
        .map_err(map_query_error)?;

    Ok(HttpResponse::Ok().json(NotificationListBody {
        notifications: records.iter().map(NotificationBody::from).collect(),
    }))
}

/// Fetch the notification record for a loan.
#[utoipa::path(
    get,
    path = "/api/v1/notifications/loans/{loan_id}",
    params(("loan_id" = String, Path, description = "Loan UUID")),
    responses(
        (status = 200, description = "Notification record", body = NotificationBody),
        (status = 400, description = "Malformed loan id", body = ErrorSchema),
        (status = 404, description = "No notification for this loan", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "getNotificationForLoan"
)]
#[get("/notifications/loans/{loan_id}")]
pub async fn get_notification_for_loan(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let loan_id = parse_loan_id(&path.into_inner())?;
    let record = state
        .notifications
        .find_by_loan(loan_id)
        .await
        .map_err(map_query_error)?
        .ok_or_else(|| Error::not_found(format!("no notification for loan {loan_id}")))?;

    Ok(HttpResponse::Ok().json(NotificationBody::from(&record)))
}
