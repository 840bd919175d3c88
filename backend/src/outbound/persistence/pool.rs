//! Shared `diesel-async` connection pool for the lending tables.
//!
//! One pass runs at a time, so the pool only has to cover the pass plus the
//! inspection endpoints. [`DbPool::connect`] refuses to hand out a pool whose
//! database cannot answer a trivial query, which keeps a bad URL from
//! surfacing later as a failed scheduled pass.

use std::time::Duration;

use diesel::sql_query;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::define_port_error;

/// Connections opened when no size is configured.
pub const DEFAULT_POOL_SIZE: u32 = 5;
/// Checkout wait when no timeout is configured.
pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

define_port_error! {
    /// Failures building, probing, or drawing from the pool.
    pub enum PoolError {
        /// The URL was rejected or no initial connection could be opened.
        Build { message: String } =>
            "failed to build connection pool: {message}",
        /// No connection freed up before the checkout timeout.
        Checkout { message: String } =>
            "failed to get connection from pool: {message}",
        /// The database accepted a connection but failed the probe query.
        Probe { message: String } =>
            "database probe failed: {message}",
    }
}

/// Pool sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    checkout_timeout: Duration,
}

impl PoolConfig {
    /// Pool for `database_url` with the default size and checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: DEFAULT_POOL_SIZE,
            checkout_timeout: DEFAULT_CHECKOUT_TIMEOUT,
        }
    }

    /// Cap the number of open connections; zero is raised to one.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    /// Bound how long a query waits for a free connection.
    #[must_use]
    pub fn with_checkout_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout = timeout;
        self
    }

    /// PostgreSQL connection URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Maximum open connections.
    pub const fn max_size(&self) -> u32 {
        self.max_size
    }
}

/// Cloneable pool handle shared by the Diesel adapters.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool and probe the database with `SELECT 1`.
    ///
    /// One connection is kept idle so the first scheduled pass does not pay
    /// the connect cost.
    ///
    /// # Errors
    /// [`PoolError::Build`] when the pool cannot be built, otherwise whatever
    /// [`DbPool::probe`] reports.
    pub async fn connect(config: &PoolConfig) -> Result<Self, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.database_url());
        let inner = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(1))
            .connection_timeout(config.checkout_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;
        let pool = Self { inner };
        pool.probe().await?;
        debug!(max_size = config.max_size, "database pool ready");
        Ok(pool)
    }

    /// Run `SELECT 1` on a pooled connection.
    ///
    /// # Errors
    /// [`PoolError::Checkout`] when no connection is free, [`PoolError::Probe`]
    /// when the query fails.
    pub async fn probe(&self) -> Result<(), PoolError> {
        let mut conn = self.get().await?;
        sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| PoolError::probe(err.to_string()))
    }

    /// Check out a connection.
    ///
    /// # Errors
    /// [`PoolError::Checkout`] when no connection frees up in time.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn new_config_uses_defaults() {
        let config = PoolConfig::new("postgres://localhost/lending");

        assert_eq!(config.database_url(), "postgres://localhost/lending");
        assert_eq!(config.max_size(), DEFAULT_POOL_SIZE);
        assert_eq!(config.checkout_timeout, DEFAULT_CHECKOUT_TIMEOUT);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(12, 12)]
    fn max_size_is_at_least_one(#[case] requested: u32, #[case] expected: u32) {
        let config = PoolConfig::new("postgres://localhost/lending").with_max_size(requested);
        assert_eq!(config.max_size(), expected);
    }

    #[rstest]
    #[case(PoolError::checkout("timed out"), "failed to get connection from pool: timed out")]
    #[case(PoolError::build("invalid URL"), "failed to build connection pool: invalid URL")]
    #[case(PoolError::probe("relation missing"), "database probe failed: relation missing")]
    fn errors_render_their_cause(#[case] error: PoolError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn connect_rejects_malformed_urls() {
        let config = PoolConfig::new("not a database url")
            .with_checkout_timeout(Duration::from_millis(200));

        let result = DbPool::connect(&config).await;

        assert!(matches!(result, Err(PoolError::Build { .. })));
    }
}
