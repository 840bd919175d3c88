//! Shared Diesel error classification for the lending repositories.
//!
//! Each repository turns a [`StoreFailure`] into its own port error so the
//! connection-versus-query split stays identical across adapters.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Coarse classification of a failed database operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreFailure {
    /// The connection was lost or could not be obtained.
    Connection(String),
    /// A unique index rejected the write.
    UniqueViolation,
    /// Any other execution failure.
    Query(String),
}

/// Extract a readable message from a pool error.
pub(crate) fn pool_failure(error: PoolError) -> StoreFailure {
    match error {
        PoolError::Checkout { message }
        | PoolError::Build { message }
        | PoolError::Probe { message } => StoreFailure::Connection(message),
    }
}

/// Classify a Diesel error, emitting debug context for the failed operation.
pub(crate) fn classify_diesel_error(error: DieselError, operation: &str) -> StoreFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), operation, "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            operation,
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => StoreFailure::Query(format!("{operation}: record not found")),
        DieselError::QueryBuilderError(_) => {
            StoreFailure::Query(format!("{operation}: database query error"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreFailure::UniqueViolation
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            StoreFailure::Connection(format!("{operation}: database connection error"))
        }
        _ => StoreFailure::Query(format!("{operation}: database error")),
    }
}
