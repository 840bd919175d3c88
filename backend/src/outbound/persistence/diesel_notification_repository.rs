//! PostgreSQL-backed `NotificationRepository` implementation using Diesel ORM.
//!
//! Rows are rebuilt through [`OverdueNotification::rehydrate`], so a row that
//! violates the status invariants is never handed to the processor. The
//! dispatch queries (`pending`, `retry_eligible`) log and skip such rows so
//! the rest of the batch still goes out; inspection queries report them as a
//! query error. The unique index on `loan_id` turns a
//! racing second insert into [`NotificationRepositoryError::DuplicateLoan`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::error;

use crate::domain::ports::{NotificationRepository, NotificationRepositoryError};
use crate::domain::{
    DeliveryContext, LoanId, NotificationId, NotificationSnapshot, NotificationStatus,
    OverdueNotification, PatronId,
};

use super::error_mapping::{StoreFailure, classify_diesel_error, pool_failure};
use super::models::{DeliveryContextRow, NewNotificationRow, NotificationRow, NotificationUpdate};
use super::pool::DbPool;
use super::schema::{books, loans, overdue_notifications, patrons};

/// Diesel-backed implementation of the `NotificationRepository` port.
#[derive(Clone)]
pub struct DieselNotificationRepository {
    pool: DbPool,
}

impl DieselNotificationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, AsyncPgConnection>, NotificationRepositoryError> {
        self.pool
            .get()
            .await
            .map_err(|err| map_failure(pool_failure(err), None))
    }
}

/// Map a classified failure; `loan_id` is set only for inserts.
fn map_failure(failure: StoreFailure, loan_id: Option<LoanId>) -> NotificationRepositoryError {
    match (failure, loan_id) {
        (StoreFailure::Connection(message), _) => NotificationRepositoryError::connection(message),
        (StoreFailure::UniqueViolation, Some(loan_id)) => {
            NotificationRepositoryError::duplicate_loan(loan_id)
        }
        (StoreFailure::UniqueViolation, None) => {
            NotificationRepositoryError::query("unexpected unique violation")
        }
        (StoreFailure::Query(message), _) => NotificationRepositoryError::query(message),
    }
}

fn query_error(operation: &'static str) -> impl Fn(diesel::result::Error) -> NotificationRepositoryError {
    move |err| map_failure(classify_diesel_error(err, operation), None)
}

fn retry_count_for_db(retry_count: u32) -> i32 {
    i32::try_from(retry_count).unwrap_or(i32::MAX)
}

fn row_to_record(row: NotificationRow) -> Result<OverdueNotification, NotificationRepositoryError> {
    let status = row.status.parse::<NotificationStatus>().map_err(|err| {
        NotificationRepositoryError::query(format!("invalid notification status in database: {err}"))
    })?;
    let retry_count = u32::try_from(row.retry_count).map_err(|_| {
        NotificationRepositoryError::query(format!(
            "negative retry count in database: {}",
            row.retry_count
        ))
    })?;

    OverdueNotification::rehydrate(NotificationSnapshot {
        id: NotificationId::from_uuid(row.id),
        loan_id: LoanId::from_uuid(row.loan_id),
        patron_id: PatronId::from_uuid(row.patron_id),
        status,
        created_at: row.created_at,
        sent_at: row.sent_at,
        error_message: row.error_message,
        retry_count,
        next_retry_at: row.next_retry_at,
    })
    .map_err(|err| NotificationRepositoryError::query(err.to_string()))
}

fn rows_to_records(
    rows: Vec<NotificationRow>,
) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
    rows.into_iter().map(row_to_record).collect()
}

/// Rebuild the rows that pass validation; the rest are logged and dropped.
fn dispatchable_records(
    rows: Vec<NotificationRow>,
    query: &'static str,
) -> Vec<OverdueNotification> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            row_to_record(row)
                .inspect_err(|err| {
                    error!(
                        notification_id = %id,
                        query,
                        error = %err,
                        "skipping unreadable notification row"
                    );
                })
                .ok()
        })
        .collect()
}

#[async_trait]
impl NotificationRepository for DieselNotificationRepository {
    async fn exists_for_loan(&self, loan_id: LoanId) -> Result<bool, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        diesel::select(diesel::dsl::exists(
            overdue_notifications::table.filter(overdue_notifications::loan_id.eq(loan_id.as_uuid())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(query_error("check notification existence"))
    }

    async fn insert(&self, record: &OverdueNotification) -> Result<(), NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let snapshot = record.snapshot();
        let row = NewNotificationRow {
            id: *snapshot.id.as_uuid(),
            loan_id: *snapshot.loan_id.as_uuid(),
            patron_id: *snapshot.patron_id.as_uuid(),
            status: snapshot.status.as_str(),
            created_at: snapshot.created_at,
            sent_at: snapshot.sent_at,
            error_message: snapshot.error_message.as_deref(),
            retry_count: retry_count_for_db(snapshot.retry_count),
            next_retry_at: snapshot.next_retry_at,
        };

        diesel::insert_into(overdue_notifications::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| {
                map_failure(
                    classify_diesel_error(err, "insert notification"),
                    Some(snapshot.loan_id),
                )
            })
    }

    async fn pending(&self) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let rows: Vec<NotificationRow> = overdue_notifications::table
            .filter(overdue_notifications::status.eq(NotificationStatus::Pending.as_str()))
            .order((
                overdue_notifications::created_at.asc(),
                overdue_notifications::id.asc(),
            ))
            .select(NotificationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(query_error("load pending notifications"))?;
        Ok(dispatchable_records(rows, "pending"))
    }

    async fn retry_eligible(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let rows: Vec<NotificationRow> = overdue_notifications::table
            .filter(overdue_notifications::status.eq(NotificationStatus::Failed.as_str()))
            .filter(overdue_notifications::retry_count.lt(retry_count_for_db(max_attempts)))
            .filter(overdue_notifications::next_retry_at.le(now))
            .order((
                overdue_notifications::created_at.asc(),
                overdue_notifications::id.asc(),
            ))
            .select(NotificationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(query_error("load retry-eligible notifications"))?;
        Ok(dispatchable_records(rows, "retry_eligible"))
    }

    async fn update(&self, record: &OverdueNotification) -> Result<(), NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let snapshot = record.snapshot();
        let changes = NotificationUpdate {
            status: snapshot.status.as_str(),
            sent_at: snapshot.sent_at,
            error_message: snapshot.error_message.as_deref(),
            retry_count: retry_count_for_db(snapshot.retry_count),
            next_retry_at: snapshot.next_retry_at,
        };

        let updated = diesel::update(overdue_notifications::table.find(snapshot.id.as_uuid()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(query_error("update notification"))?;

        if updated == 0 {
            return Err(NotificationRepositoryError::not_found(format!(
                "notification {}",
                snapshot.id
            )));
        }
        Ok(())
    }

    async fn delivery_context(
        &self,
        record: &OverdueNotification,
    ) -> Result<Option<DeliveryContext>, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<DeliveryContextRow> = loans::table
            .inner_join(books::table)
            .inner_join(patrons::table)
            .filter(loans::id.eq(record.loan_id().as_uuid()))
            .filter(patrons::id.eq(record.patron_id().as_uuid()))
            .select((patrons::email, patrons::full_name, books::title, loans::due_at))
            .first(&mut conn)
            .await
            .optional()
            .map_err(query_error("resolve delivery context"))?;

        Ok(row.map(|row| DeliveryContext {
            recipient_email: row.email,
            recipient_name: row.full_name,
            item_title: row.title,
            due_at: row.due_at,
        }))
    }

    async fn find_by_loan(
        &self,
        loan_id: LoanId,
    ) -> Result<Option<OverdueNotification>, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<NotificationRow> = overdue_notifications::table
            .filter(overdue_notifications::loan_id.eq(loan_id.as_uuid()))
            .select(NotificationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(query_error("find notification by loan"))?;
        row.map(row_to_record).transpose()
    }

    async fn list(
        &self,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let mut query = overdue_notifications::table
            .select(NotificationRow::as_select())
            .order((
                overdue_notifications::created_at.asc(),
                overdue_notifications::id.asc(),
            ))
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(overdue_notifications::status.eq(status.as_str()));
        }
        let rows: Vec<NotificationRow> = query
            .load(&mut conn)
            .await
            .map_err(query_error("list notifications"))?;
        rows_to_records(rows)
    }
}
