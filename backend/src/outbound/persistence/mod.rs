//! PostgreSQL persistence adapters built on Diesel and `diesel-async`.
//!
//! The lending system owns `patrons`, `books`, and `loans`; the notifier reads
//! them and owns `overdue_notifications`.

mod diesel_notification_repository;
mod diesel_overdue_loan_source;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_notification_repository::DieselNotificationRepository;
pub use diesel_overdue_loan_source::DieselOverdueLoanSource;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
