//! Reqwest-backed email gateway adapter.
//!
//! POSTs one JSON email request per reminder. The adapter owns transport
//! details only: a 2xx answer is a delivery, a 4xx answer is a decline, and
//! anything else is a channel error the processor records as a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::{REMINDER_SUBJECT, render_reminder};
use crate::domain::ports::{
    DeliveryChannel, DeliveryChannelError, DeliveryOutcome, DeliveryRequest,
};

const USER_AGENT: &str = "lending-notifier/0.1";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// JSON body sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailGatewayPayload {
    /// Recipient address.
    pub to: String,
    /// Recipient display name.
    pub to_name: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Notification id; repeated attempts carry the same key.
    pub idempotency_key: String,
}

impl From<&DeliveryRequest> for EmailGatewayPayload {
    fn from(request: &DeliveryRequest) -> Self {
        Self {
            to: request.recipient_email.clone(),
            to_name: request.recipient_name.clone(),
            subject: REMINDER_SUBJECT.to_owned(),
            body: render_reminder(request),
            idempotency_key: request.notification_id.to_string(),
        }
    }
}

/// Delivery channel that hands reminders to an HTTP email gateway.
pub struct HttpEmailGateway {
    client: Client,
    endpoint: Url,
}

impl HttpEmailGateway {
    /// Build an adapter with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl DeliveryChannel for HttpEmailGateway {
    async fn deliver(
        &self,
        request: &DeliveryRequest,
    ) -> Result<DeliveryOutcome, DeliveryChannelError> {
        let payload = EmailGatewayPayload::from(request);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(IDEMPOTENCY_HEADER, payload.idempotency_key.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(DeliveryOutcome::Delivered);
        }
        if status.is_client_error() {
            tracing::debug!(status = status.as_u16(), "email gateway declined reminder");
            return Ok(DeliveryOutcome::Declined);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(map_status_error(status, body.as_ref()))
    }
}

fn map_transport_error(error: reqwest::Error) -> DeliveryChannelError {
    if error.is_timeout() {
        DeliveryChannelError::timeout(error.to_string())
    } else {
        DeliveryChannelError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> DeliveryChannelError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };

    match status {
        StatusCode::GATEWAY_TIMEOUT => DeliveryChannelError::timeout(message),
        _ if status.is_redirection() => DeliveryChannelError::rejected(message),
        _ => DeliveryChannelError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 120;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
        format!("{preview}...")
    } else {
        compact
    }
}
