//! In-process lending store for local runs and integration tests.
//!
//! Implements both discovery and notification persistence over
//! mutex-guarded maps, enforcing the same per-loan uniqueness and eligibility
//! filters as the PostgreSQL adapter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::ports::{
    NotificationRepository, NotificationRepositoryError, OverdueLoanSource,
    OverdueLoanSourceError,
};
use crate::domain::{
    BookId, DeliveryContext, Loan, LoanId, NotificationId, NotificationStatus, OverdueLoan,
    OverdueNotification, PatronId,
};

/// Standard lending period applied to seeded loans.
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Borrower contact details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatronRecord {
    /// Patron identifier.
    pub id: PatronId,
    /// Display name used in reminders.
    pub full_name: String,
    /// Reminder address.
    pub email: String,
}

/// Catalogue entry for a lendable book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    /// Book identifier.
    pub id: BookId,
    /// Title used in reminders.
    pub title: String,
    /// Author, for display.
    pub author: String,
}

#[derive(Debug, Default)]
struct LendingTables {
    patrons: HashMap<PatronId, PatronRecord>,
    books: HashMap<BookId, BookRecord>,
    loans: HashMap<LoanId, Loan>,
    notifications: HashMap<NotificationId, OverdueNotification>,
}

impl LendingTables {
    fn sorted_notifications<F>(&self, keep: F) -> Vec<OverdueNotification>
    where
        F: Fn(&OverdueNotification) -> bool,
    {
        let mut records: Vec<_> = self
            .notifications
            .values()
            .filter(|record| keep(record))
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.created_at(), *record.id().as_uuid()));
        records
    }
}

/// Mutex-guarded lending data.
#[derive(Debug, Default)]
pub struct InMemoryLendingStore {
    tables: Mutex<LendingTables>,
}

const POISONED: &str = "in-memory lending store lock poisoned";

impl InMemoryLendingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding demo patrons, books, and loans relative to `now`.
    ///
    /// One loan is six days overdue and one was returned on time, so a first
    /// pass creates and dispatches exactly one reminder.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let patron = PatronRecord {
            id: PatronId::random(),
            full_name: "John Doe".to_owned(),
            email: "john.doe@example.com".to_owned(),
        };
        let effective_java = BookRecord {
            id: BookId::random(),
            title: "Effective Java".to_owned(),
            author: "Joshua Bloch".to_owned(),
        };
        let clean_code = BookRecord {
            id: BookId::random(),
            title: "Clean Code".to_owned(),
            author: "Robert C. Martin".to_owned(),
        };

        let overdue_due = now - TimeDelta::days(6);
        let returned_due = now - TimeDelta::days(2);
        let loans = [
            Loan {
                id: LoanId::random(),
                book_id: effective_java.id,
                patron_id: patron.id,
                loaned_at: overdue_due - TimeDelta::days(LOAN_PERIOD_DAYS),
                due_at: overdue_due,
                returned_at: None,
            },
            Loan {
                id: LoanId::random(),
                book_id: clean_code.id,
                patron_id: patron.id,
                loaned_at: returned_due - TimeDelta::days(LOAN_PERIOD_DAYS),
                due_at: returned_due,
                returned_at: Some(returned_due - TimeDelta::days(1)),
            },
        ];

        let mut tables = LendingTables::default();
        tables.patrons.insert(patron.id, patron);
        tables.books.insert(effective_java.id, effective_java);
        tables.books.insert(clean_code.id, clean_code);
        for loan in loans {
            tables.loans.insert(loan.id, loan);
        }
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, LendingTables>, NotificationRepositoryError> {
        self.tables
            .lock()
            .map_err(|_| NotificationRepositoryError::query(POISONED))
    }

    /// Register or replace a patron.
    pub fn upsert_patron(&self, patron: PatronRecord) -> Result<(), NotificationRepositoryError> {
        self.tables()?.patrons.insert(patron.id, patron);
        Ok(())
    }

    /// Register or replace a book.
    pub fn upsert_book(&self, book: BookRecord) -> Result<(), NotificationRepositoryError> {
        self.tables()?.books.insert(book.id, book);
        Ok(())
    }

    /// Register or replace a loan.
    pub fn upsert_loan(&self, loan: Loan) -> Result<(), NotificationRepositoryError> {
        self.tables()?.loans.insert(loan.id, loan);
        Ok(())
    }

    /// Record a return. Returns `false` when the loan is unknown.
    pub fn return_loan(
        &self,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> Result<bool, NotificationRepositoryError> {
        let mut tables = self.tables()?;
        let Some(loan) = tables.loans.get_mut(&loan_id) else {
            return Ok(false);
        };
        loan.returned_at = Some(returned_at);
        Ok(true)
    }

    /// All stored loans.
    pub fn loans(&self) -> Result<Vec<Loan>, NotificationRepositoryError> {
        Ok(self.tables()?.loans.values().cloned().collect())
    }
}

#[async_trait]
impl OverdueLoanSource for InMemoryLendingStore {
    async fn overdue_unreturned_loans(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<OverdueLoan>, OverdueLoanSourceError> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| OverdueLoanSourceError::query(POISONED))?;
        let mut overdue: Vec<_> = tables
            .loans
            .values()
            .filter(|loan| loan.is_overdue(now))
            .map(Loan::to_overdue)
            .collect();
        overdue.sort_by_key(|loan| loan.due_at);
        Ok(overdue)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryLendingStore {
    async fn exists_for_loan(&self, loan_id: LoanId) -> Result<bool, NotificationRepositoryError> {
        Ok(self
            .tables()?
            .notifications
            .values()
            .any(|record| record.loan_id() == loan_id))
    }

    async fn insert(&self, record: &OverdueNotification) -> Result<(), NotificationRepositoryError> {
        let mut tables = self.tables()?;
        if tables
            .notifications
            .values()
            .any(|existing| existing.loan_id() == record.loan_id())
        {
            return Err(NotificationRepositoryError::duplicate_loan(record.loan_id()));
        }
        tables.notifications.insert(record.id(), record.clone());
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        Ok(self
            .tables()?
            .sorted_notifications(|record| record.status() == NotificationStatus::Pending))
    }

    async fn retry_eligible(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        Ok(self.tables()?.sorted_notifications(|record| {
            record.status() == NotificationStatus::Failed
                && record.retry_count() < max_attempts
                && record.next_retry_at().is_some_and(|at| at <= now)
        }))
    }

    async fn update(&self, record: &OverdueNotification) -> Result<(), NotificationRepositoryError> {
        let mut tables = self.tables()?;
        let Some(slot) = tables.notifications.get_mut(&record.id()) else {
            return Err(NotificationRepositoryError::not_found(format!(
                "notification {}",
                record.id()
            )));
        };
        *slot = record.clone();
        Ok(())
    }

    async fn delivery_context(
        &self,
        record: &OverdueNotification,
    ) -> Result<Option<DeliveryContext>, NotificationRepositoryError> {
        let tables = self.tables()?;
        let context = tables.loans.get(&record.loan_id()).and_then(|loan| {
            let patron = tables.patrons.get(&record.patron_id())?;
            let book = tables.books.get(&loan.book_id)?;
            Some(DeliveryContext {
                recipient_email: patron.email.clone(),
                recipient_name: patron.full_name.clone(),
                item_title: book.title.clone(),
                due_at: loan.due_at,
            })
        });
        Ok(context)
    }

    async fn find_by_loan(
        &self,
        loan_id: LoanId,
    ) -> Result<Option<OverdueNotification>, NotificationRepositoryError> {
        Ok(self
            .tables()?
            .notifications
            .values()
            .find(|record| record.loan_id() == loan_id)
            .cloned())
    }

    async fn list(
        &self,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<OverdueNotification>, NotificationRepositoryError> {
        Ok(self
            .tables()?
            .sorted_notifications(|record| status.is_none_or(|wanted| record.status() == wanted)))
    }
}
