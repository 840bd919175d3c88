//! Domain error to HTTP response mapping.
//!
//! Internal failures are logged in full and redacted on the wire. Transient
//! failures carry `Retry-After` so clients back off instead of hammering a
//! store that is already struggling.

use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, ResponseError};
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode};

/// Result alias for notification handlers.
pub type ApiResult<T> = Result<T, Error>;

/// Seconds a client should wait after a 503.
pub const RETRY_AFTER_SECS: u32 = 30;

const REDACTED_MESSAGE: &str = "Internal server error";

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header((header::CACHE_CONTROL, "no-store"));

        match self.code() {
            ErrorCode::InternalError => {
                error!(error = %self, details = ?self.details(), "request failed");
                return response.json(Error::internal(REDACTED_MESSAGE));
            }
            code if code.is_transient() => {
                warn!(error = %self, "request hit an unavailable collaborator");
                response.insert_header((header::RETRY_AFTER, RETRY_AFTER_SECS.to_string()));
            }
            _ => {}
        }
        response.json(self)
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Self::internal(REDACTED_MESSAGE)
    }
}
