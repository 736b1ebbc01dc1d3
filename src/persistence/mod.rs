//! Persistence layer for StaySmart.
//!
//! Owns the SQLite pool and exposes the three executor primitives
//! (fetch-one, fetch-all, execute) that every domain query is built on.
//! Domain operations live in one module per entity; multi-step writes open a
//! transaction with [`StaySmartDb::begin`] and commit once at the end.

pub mod applications;
pub mod dorms;
pub mod migrations;
pub mod payment_requests;
pub mod payments;
pub mod rentals;
pub mod rooms;
pub mod stats;
pub mod transactions;
pub mod users;

pub use applications::{NewApplication, PendingRequest, RecentReservation, UserReservation};
pub use dorms::{HostProperty, NewDorm, NewRoom, PropertyUpdate};
pub use payment_requests::PendingPaymentRequest;
pub use payments::TenantPayment;
pub use rentals::{CurrentOccupant, TenantDue};
pub use rooms::{CapacityFilter, OccupiedRoom, RoomListing, RoomSearch};
pub use stats::{MonthlyEarnings, OwnerStats, RecentTransaction, TenantDashboard};
pub use transactions::NewTransaction;
pub use users::{NewUser, TenantProfileView};

use crate::config::{BillingConfig, Config, DatabaseConfig, DatabaseLocation};
use crate::error::{Result, StaySmartError};
use chrono::NaiveDate;
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::{FromRow, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

const MAX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 100;

/// Main handle to the StaySmart relational store.
#[derive(Clone)]
pub struct StaySmartDb {
    pool: SqlitePool,
    location: DatabaseLocation,
    billing: BillingConfig,
}

impl StaySmartDb {
    /// Opens the store described by `config`, creating and migrating it as needed.
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let location = config.database.location()?;

        if let DatabaseLocation::File(path) = &location {
            Self::ensure_parent_dirs(path)?;
        }

        let pool = Self::try_connect(&location, &config.database).await?;
        migrations::run_migrations(&pool).await?;

        match &location {
            DatabaseLocation::File(path) => info!("Database opened at {}", path.display()),
            DatabaseLocation::Memory => info!("In-memory database opened"),
        }

        Ok(Self {
            pool,
            location,
            billing: config.billing.clone(),
        })
    }

    /// Opens a private in-memory store with default billing settings.
    pub async fn open_in_memory() -> Result<Self> {
        let config = Config {
            database: DatabaseConfig::in_memory(),
            ..Default::default()
        };
        Self::open(&config).await
    }

    /// Attempts to connect with retries for lock contention.
    async fn try_connect(
        location: &DatabaseLocation,
        config: &DatabaseConfig,
    ) -> Result<SqlitePool> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * 2u64.pow(attempt)))
                    .await;
            }

            match Self::connect(location, config).await {
                Ok(pool) => return Ok(pool),
                Err(e) => {
                    warn!("Connection attempt {} failed: {e}", attempt + 1);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            StaySmartError::connection("Failed to open database after retries")
        }))
    }

    /// Creates a connection pool for the given location.
    async fn connect(location: &DatabaseLocation, config: &DatabaseConfig) -> Result<SqlitePool> {
        let options = match location {
            DatabaseLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .journal_mode(SqliteJournalMode::Wal),
            DatabaseLocation::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StaySmartError::config(format!("Invalid database url: {e}")))?,
        }
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .create_if_missing(true);

        let pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

        let pool_options = match location {
            DatabaseLocation::File(_) => pool_options.max_connections(config.max_connections),
            // A second in-memory connection would see an empty database,
            // so the single connection is pinned for the pool's lifetime.
            DatabaseLocation::Memory => pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        };

        pool_options
            .connect_with(options)
            .await
            .map_err(|e| StaySmartError::connection(format!("Failed to connect to database: {e}")))
    }

    /// Ensures parent directories exist for the database path.
    fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if parent.as_os_str().is_empty() {
                return Ok(());
            }
            std::fs::create_dir_all(parent).map_err(|e| {
                StaySmartError::persistence(format!(
                    "Failed to create data directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(())
    }

    /// Returns where the store lives.
    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Returns the billing settings the store was opened with.
    pub fn billing(&self) -> &BillingConfig {
        &self.billing
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetches at most one row; `None` when the query matches nothing.
    pub async fn fetch_one<'q, T>(
        &self,
        query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("fetch_one", e))
    }

    /// Fetches every matching row; an empty vector when nothing matches.
    pub async fn fetch_all<'q, T>(
        &self,
        query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("fetch_all", e))
    }

    /// Executes a statement and returns the auto-generated row id.
    pub async fn execute<'q>(&self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Result<i64> {
        query
            .execute(&self.pool)
            .await
            .map(|done| done.last_insert_rowid())
            .map_err(|e| store_error("execute", e))
    }

    /// Executes a statement and returns the number of rows it changed.
    pub async fn execute_count<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<u64> {
        query
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| store_error("execute", e))
    }

    /// Starts a transaction; dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| store_error("begin", e))
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// `date` moved by `days`, or an error when the result leaves the calendar.
pub(crate) fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    chrono::Duration::try_days(days)
        .and_then(|span| date.checked_add_signed(span))
        .ok_or_else(|| {
            StaySmartError::internal(format!("{date} plus {days} days is out of range"))
        })
}

/// Logs a failed store call and converts it into the crate error.
pub(crate) fn store_error(operation: &'static str, err: sqlx::Error) -> StaySmartError {
    warn!(operation, error = %err, "store operation failed");
    err.into()
}
