//! PostgreSQL-backed `OverdueLoanSource` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{OverdueLoanSource, OverdueLoanSourceError};
use crate::domain::{LoanId, OverdueLoan, PatronId};

use super::error_mapping::{StoreFailure, classify_diesel_error, pool_failure};
use super::models::OverdueLoanRow;
use super::pool::DbPool;
use super::schema::loans;

/// Reads unreturned loans past their due time from the `loans` table.
#[derive(Clone)]
pub struct DieselOverdueLoanSource {
    pool: DbPool,
}

impl DieselOverdueLoanSource {
    /// Create a new source with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: StoreFailure) -> OverdueLoanSourceError {
    match failure {
        StoreFailure::Connection(message) => OverdueLoanSourceError::connection(message),
        StoreFailure::UniqueViolation => OverdueLoanSourceError::query("unexpected unique violation"),
        StoreFailure::Query(message) => OverdueLoanSourceError::query(message),
    }
}

#[async_trait]
impl OverdueLoanSource for DieselOverdueLoanSource {
    async fn overdue_unreturned_loans(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<OverdueLoan>, OverdueLoanSourceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_failure(pool_failure(err)))?;

        let rows: Vec<OverdueLoanRow> = loans::table
            .filter(loans::returned_at.is_null())
            .filter(loans::due_at.lt(now))
            .order((loans::due_at.asc(), loans::id.asc()))
            .select(OverdueLoanRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel_error(err, "load overdue loans")))?;

        Ok(rows
            .into_iter()
            .map(|row| OverdueLoan {
                loan_id: LoanId::from_uuid(row.id),
                patron_id: PatronId::from_uuid(row.patron_id),
                due_at: row.due_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn connection_failures_stay_connection_errors() {
        let err = map_failure(StoreFailure::Connection("refused".to_owned()));
        assert!(matches!(err, OverdueLoanSourceError::Connection { .. }));
    }

    #[rstest]
    fn other_failures_become_query_errors() {
        let err = map_failure(StoreFailure::Query("syntax".to_owned()));
        assert_eq!(err.to_string(), OverdueLoanSourceError::query("syntax").to_string());
    }
}
