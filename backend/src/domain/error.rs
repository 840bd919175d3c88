//! Whole-pass and request failures.
//!
//! Per-record delivery problems never surface here; they are recorded on the
//! notification itself. An [`Error`] means a pass or request could not run.
//! Inbound adapters decide how to present it (HTTP envelope, scheduler log).

use serde::Serialize;
use serde_json::Value;

/// Failure category shared by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The requested resource does not exist.
    NotFound,
    /// A collaborator (store, discovery query) is temporarily unavailable.
    ServiceUnavailable,
    /// A bug or unexpected collaborator answer.
    InternalError,
}

impl ErrorCode {
    /// Whether repeating the same call later may succeed.
    ///
    /// The scheduler treats every failed pass as retryable; HTTP uses this
    /// to advertise `Retry-After`.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::ServiceUnavailable)
    }

    const fn fallback_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid request",
            Self::NotFound => "not found",
            Self::ServiceUnavailable => "service unavailable",
            Self::InternalError => "internal error",
        }
    }
}

/// Error returned by the processor and by request handlers.
///
/// The message is never blank: empty input is replaced by a generic
/// description of the code.
///
/// # Examples
/// ```
/// use lending_backend::domain::{Error, ErrorCode};
///
/// let err = Error::service_unavailable("notification store: pool timed out");
/// assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
/// assert!(err.code().is_transient());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Build an error, substituting a fallback for a blank message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            code.fallback_message().to_owned()
        } else {
            message
        };
        Self {
            code,
            message,
            details: None,
        }
    }

    /// Failure category.
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured context for clients, if any.
    pub const fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured context.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// [`ErrorCode::InvalidRequest`] with `message`.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// [`ErrorCode::NotFound`] with `message`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// [`ErrorCode::ServiceUnavailable`] with `message`.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// [`ErrorCode::InternalError`] with `message`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}
