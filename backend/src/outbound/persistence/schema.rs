//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. The
//! `diesel print-schema` command can regenerate them from a live database.

diesel::table! {
    /// Borrowers who receive overdue reminders.
    patrons (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Display name used in reminders.
        full_name -> Varchar,
        /// Reminder address.
        email -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Lendable catalogue entries.
    books (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Title used in reminders.
        title -> Varchar,
        /// Author for display.
        author -> Varchar,
        /// Optional ISBN-10 or ISBN-13.
        isbn -> Nullable<Varchar>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Loans of books to patrons.
    ///
    /// A partial index on `due_at` covers unreturned loans for discovery.
    loans (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Borrowed book.
        book_id -> Uuid,
        /// Borrowing patron.
        patron_id -> Uuid,
        /// When the book was lent.
        loaned_at -> Timestamptz,
        /// When the book must be back.
        due_at -> Timestamptz,
        /// When the book came back, if it has.
        returned_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// One reminder record per overdue loan.
    ///
    /// `loan_id` carries a unique index so a second insert for the same loan
    /// fails with a unique violation.
    overdue_notifications (id) {
        /// Primary key: UUID v4 identifier generated by the domain.
        id -> Uuid,
        /// Loan the reminder is about.
        loan_id -> Uuid,
        /// Recipient patron.
        patron_id -> Uuid,
        /// `pending`, `sent`, or `failed`.
        status -> Varchar,
        /// When the record was created.
        created_at -> Timestamptz,
        /// Set once delivery succeeded.
        sent_at -> Nullable<Timestamptz>,
        /// Last failure reason.
        error_message -> Nullable<Text>,
        /// Failed attempts so far.
        retry_count -> Int4,
        /// Earliest time a failed record may be retried.
        next_retry_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(loans -> books (book_id));
diesel::joinable!(loans -> patrons (patron_id));
diesel::joinable!(overdue_notifications -> loans (loan_id));

diesel::allow_tables_to_appear_in_same_query!(books, loans, overdue_notifications, patrons);
