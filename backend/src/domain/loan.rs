//! Loan projections consumed by overdue notification discovery.
//!
//! Lending rules (issuing loans, computing due dates, returns) live outside
//! this service. The notifier only needs the overdue predicate and the
//! identifiers it keys notifications on.

use chrono::{DateTime, Utc};

use super::ids::{BookId, LoanId, PatronId};

/// Read-only view of a loan as stored by the lending system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    /// Loan identifier.
    pub id: LoanId,
    /// Borrowed book.
    pub book_id: BookId,
    /// Borrowing patron.
    pub patron_id: PatronId,
    /// When the book was lent.
    pub loaned_at: DateTime<Utc>,
    /// When the book must be back.
    pub due_at: DateTime<Utc>,
    /// When the book came back, if it has.
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// Whether the loan is unreturned and `now` is past its due time.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use lending_backend::domain::{BookId, Loan, LoanId, PatronId};
    ///
    /// let now = Utc::now();
    /// let loan = Loan {
    ///     id: LoanId::random(),
    ///     book_id: BookId::random(),
    ///     patron_id: PatronId::random(),
    ///     loaned_at: now - Duration::days(20),
    ///     due_at: now - Duration::days(6),
    ///     returned_at: None,
    /// };
    /// assert!(loan.is_overdue(now));
    /// ```
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.returned_at.is_none() && now > self.due_at
    }

    /// Project the fields discovery needs.
    pub fn to_overdue(&self) -> OverdueLoan {
        OverdueLoan {
            loan_id: self.id,
            patron_id: self.patron_id,
            due_at: self.due_at,
        }
    }
}

/// An unreturned loan whose due time has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverdueLoan {
    /// Loan identifier; notifications are unique per loan.
    pub loan_id: LoanId,
    /// Borrowing patron.
    pub patron_id: PatronId,
    /// Missed due time.
    pub due_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
            .single()
            .expect("valid time")
    }

    fn loan(due_at: DateTime<Utc>, returned_at: Option<DateTime<Utc>>) -> Loan {
        Loan {
            id: LoanId::random(),
            book_id: BookId::random(),
            patron_id: PatronId::random(),
            loaned_at: due_at - Duration::days(14),
            due_at,
            returned_at,
        }
    }

    #[rstest]
    fn past_due_and_unreturned_is_overdue(now: DateTime<Utc>) {
        assert!(loan(now - Duration::days(6), None).is_overdue(now));
    }

    #[rstest]
    fn exactly_due_is_not_overdue(now: DateTime<Utc>) {
        assert!(!loan(now, None).is_overdue(now));
    }

    #[rstest]
    fn returned_loans_are_never_overdue(now: DateTime<Utc>) {
        let due = now - Duration::days(6);
        assert!(!loan(due, Some(due - Duration::days(1))).is_overdue(now));
        assert!(!loan(due, Some(now)).is_overdue(now));
    }
}
