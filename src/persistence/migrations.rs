//! Schema versioning and migrations for the StaySmart store.
//!
//! Manages database schema evolution with forward-only migrations. Each
//! version is applied inside its own transaction together with its
//! `schema_versions` row.

use crate::error::{Result, StaySmartError};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use tracing::info;

pub(crate) const CURRENT_VERSION: i32 = 2;

/// Amenity labels offered by the dorm form out of the box.
pub const DEFAULT_AMENITIES: [&str; 8] = [
    "Wi-Fi",
    "Air Conditioning",
    "Private Bathroom",
    "Study Desk",
    "Laundry Area",
    "Kitchen Access",
    "Parking",
    "CCTV",
];

/// Runs all pending migrations on the database.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    ensure_schema_versions_table(pool).await?;

    let current = get_current_version(pool).await?;

    if current > CURRENT_VERSION {
        return Err(StaySmartError::persistence(format!(
            "Database schema version ({}) is newer than supported version ({}). \
             Please upgrade StaySmart to the latest version.",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        info!(
            "Migrating database from version {} to {}",
            current, CURRENT_VERSION
        );
        run_pending_migrations(pool, current).await?;
    }

    Ok(())
}

/// Ensures the schema_versions table exists.
async fn ensure_schema_versions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_versions (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        StaySmartError::persistence(format!("Failed to create schema_versions table: {e}"))
    })?;

    Ok(())
}

/// Gets the current schema version.
pub(crate) async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM schema_versions")
        .fetch_optional(pool)
        .await
        .map_err(|e| StaySmartError::persistence(format!("Failed to get schema version: {e}")))?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Runs migrations from the current version to the target version.
async fn run_pending_migrations(pool: &SqlitePool, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        let mut tx = pool.begin().await.map_err(|e| {
            StaySmartError::persistence(format!("Failed to start migration v{version}: {e}"))
        })?;

        run_migration(&mut tx, version).await?;
        record_version(&mut tx, version).await?;

        tx.commit().await.map_err(|e| {
            StaySmartError::persistence(format!("Failed to commit migration v{version}: {e}"))
        })?;
        info!("Applied migration v{}", version);
    }
    Ok(())
}

/// Records a completed migration version.
async fn record_version(conn: &mut SqliteConnection, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_versions (version) VALUES (?)")
        .bind(version)
        .execute(conn)
        .await
        .map_err(|e| StaySmartError::persistence(format!("Failed to record migration: {e}")))?;
    Ok(())
}

/// Runs a specific migration version.
async fn run_migration(conn: &mut SqliteConnection, version: i32) -> Result<()> {
    match version {
        1 => migration_v1(conn).await,
        2 => migration_v2(conn).await,
        _ => Err(StaySmartError::persistence(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

async fn apply_statements(conn: &mut SqliteConnection, statements: &[(&str, &str)]) -> Result<()> {
    for &(label, sql) in statements {
        sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| StaySmartError::persistence(format!("Failed to create {label}: {e}")))?;
    }
    Ok(())
}

/// Migration v1: Initial schema with all tables.
async fn migration_v1(conn: &mut SqliteConnection) -> Result<()> {
    apply_statements(
        conn,
        &[
            (
                "users table",
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    role TEXT NOT NULL CHECK (role IN ('TENANT', 'OWNER')),
                    fullname TEXT NOT NULL,
                    username TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL UNIQUE,
                    contact_no TEXT,
                    password_hash TEXT NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
            ),
            (
                "owner_profiles table",
                r#"
                CREATE TABLE IF NOT EXISTS owner_profiles (
                    owner_id INTEGER PRIMARY KEY,
                    display_name TEXT,
                    messenger_link TEXT,
                    facebook_link TEXT,
                    FOREIGN KEY (owner_id) REFERENCES users(user_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "tenant_profiles table",
                r#"
                CREATE TABLE IF NOT EXISTS tenant_profiles (
                    tenant_id INTEGER PRIMARY KEY,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    gender TEXT,
                    guardian_fullname TEXT,
                    guardian_contact TEXT,
                    guardian_email TEXT,
                    profile_picture_url TEXT,
                    agreed_terms INTEGER NOT NULL DEFAULT 0,
                    FOREIGN KEY (tenant_id) REFERENCES users(user_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "dorms table",
                r#"
                CREATE TABLE IF NOT EXISTS dorms (
                    dorm_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner_id INTEGER NOT NULL,
                    dorm_name TEXT NOT NULL,
                    location_text TEXT NOT NULL DEFAULT '',
                    latitude REAL,
                    longitude REAL,
                    dorm_type TEXT NOT NULL DEFAULT 'MIXED'
                        CHECK (dorm_type IN ('MALE', 'FEMALE', 'MIXED')),
                    no_of_rooms INTEGER NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT 'OPEN'
                        CHECK (status IN ('OPEN', 'FULL', 'UNDER_MAINTENANCE')),
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    FOREIGN KEY (owner_id) REFERENCES users(user_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "dorm_images table",
                r#"
                CREATE TABLE IF NOT EXISTS dorm_images (
                    image_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    dorm_id INTEGER NOT NULL,
                    file_path TEXT NOT NULL,
                    FOREIGN KEY (dorm_id) REFERENCES dorms(dorm_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "rooms table",
                r#"
                CREATE TABLE IF NOT EXISTS rooms (
                    room_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    dorm_id INTEGER NOT NULL,
                    room_no TEXT NOT NULL,
                    room_type TEXT,
                    capacity INTEGER NOT NULL DEFAULT 1 CHECK (capacity >= 0),
                    price_monthly REAL NOT NULL DEFAULT 0,
                    is_available INTEGER NOT NULL DEFAULT 1,
                    FOREIGN KEY (dorm_id) REFERENCES dorms(dorm_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "amenities table",
                r#"
                CREATE TABLE IF NOT EXISTS amenities (
                    amenity_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    label TEXT NOT NULL UNIQUE
                )
                "#,
            ),
            (
                "room_amenities table",
                r#"
                CREATE TABLE IF NOT EXISTS room_amenities (
                    room_id INTEGER NOT NULL,
                    amenity_id INTEGER NOT NULL,
                    PRIMARY KEY (room_id, amenity_id),
                    FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE,
                    FOREIGN KEY (amenity_id) REFERENCES amenities(amenity_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "rental_applications table",
                r#"
                CREATE TABLE IF NOT EXISTS rental_applications (
                    application_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    tenant_id INTEGER NOT NULL,
                    dorm_id INTEGER NOT NULL,
                    room_id INTEGER NOT NULL,
                    action_status TEXT NOT NULL DEFAULT 'WAITING'
                        CHECK (action_status IN ('WAITING', 'APPROVED', 'REJECTED', 'CANCELLED')),
                    remarks TEXT,
                    submitted_at TEXT NOT NULL DEFAULT (datetime('now')),
                    reviewed_at TEXT,
                    FOREIGN KEY (tenant_id) REFERENCES users(user_id) ON DELETE CASCADE,
                    FOREIGN KEY (dorm_id) REFERENCES dorms(dorm_id) ON DELETE CASCADE,
                    FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "application_details table",
                r#"
                CREATE TABLE IF NOT EXISTS application_details (
                    application_id INTEGER PRIMARY KEY,
                    additional_notes TEXT,
                    tenant_fullname TEXT,
                    tenant_email TEXT,
                    tenant_phone TEXT,
                    tenant_gender TEXT,
                    FOREIGN KEY (application_id)
                        REFERENCES rental_applications(application_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "rentals table",
                r#"
                CREATE TABLE IF NOT EXISTS rentals (
                    rental_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    application_id INTEGER,
                    tenant_id INTEGER NOT NULL,
                    room_id INTEGER NOT NULL,
                    status TEXT NOT NULL DEFAULT 'ACTIVE'
                        CHECK (status IN ('ACTIVE', 'EXTENDED', 'ENDING', 'ENDED')),
                    start_date TEXT NOT NULL,
                    end_date TEXT,
                    FOREIGN KEY (application_id)
                        REFERENCES rental_applications(application_id) ON DELETE SET NULL,
                    FOREIGN KEY (tenant_id) REFERENCES users(user_id) ON DELETE CASCADE,
                    FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "payments table",
                r#"
                CREATE TABLE IF NOT EXISTS payments (
                    payment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    rental_id INTEGER NOT NULL,
                    due_date TEXT NOT NULL,
                    amount_due REAL NOT NULL,
                    amount_paid REAL NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT 'PENDING'
                        CHECK (status IN ('PENDING', 'DUE', 'OVERDUE', 'PAID')),
                    paid_at TEXT,
                    FOREIGN KEY (rental_id) REFERENCES rentals(rental_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "payment_requests table",
                r#"
                CREATE TABLE IF NOT EXISTS payment_requests (
                    request_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    tenant_id INTEGER NOT NULL,
                    rental_id INTEGER NOT NULL,
                    amount REAL NOT NULL,
                    proof_image TEXT,
                    status TEXT NOT NULL DEFAULT 'PENDING'
                        CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
                    remarks TEXT,
                    submitted_at TEXT NOT NULL DEFAULT (datetime('now')),
                    reviewed_at TEXT,
                    FOREIGN KEY (tenant_id) REFERENCES users(user_id) ON DELETE CASCADE,
                    FOREIGN KEY (rental_id) REFERENCES rentals(rental_id) ON DELETE CASCADE
                )
                "#,
            ),
            (
                "transactions table",
                r#"
                CREATE TABLE IF NOT EXISTS transactions (
                    transaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner_id INTEGER NOT NULL,
                    tenant_id INTEGER NOT NULL,
                    rental_id INTEGER,
                    amount REAL NOT NULL,
                    status TEXT NOT NULL DEFAULT 'PAID' CHECK (status IN ('PAID', 'PENDING')),
                    transaction_date TEXT NOT NULL DEFAULT (date('now')),
                    FOREIGN KEY (owner_id) REFERENCES users(user_id) ON DELETE CASCADE,
                    FOREIGN KEY (tenant_id) REFERENCES users(user_id) ON DELETE CASCADE,
                    FOREIGN KEY (rental_id) REFERENCES rentals(rental_id) ON DELETE SET NULL
                )
                "#,
            ),
        ],
    )
    .await?;

    for label in DEFAULT_AMENITIES {
        sqlx::query("INSERT OR IGNORE INTO amenities (label) VALUES (?)")
            .bind(label)
            .execute(&mut *conn)
            .await
            .map_err(|e| StaySmartError::persistence(format!("Failed to seed amenities: {e}")))?;
    }

    Ok(())
}

/// Migration v2: Indexes for the owner dashboards and billing sweeps.
async fn migration_v2(conn: &mut SqliteConnection) -> Result<()> {
    apply_statements(
        conn,
        &[
            (
                "dorms owner index",
                "CREATE INDEX IF NOT EXISTS idx_dorms_owner ON dorms(owner_id)",
            ),
            (
                "rooms dorm index",
                "CREATE INDEX IF NOT EXISTS idx_rooms_dorm ON rooms(dorm_id)",
            ),
            (
                "rentals status index",
                "CREATE INDEX IF NOT EXISTS idx_rentals_room_status ON rentals(room_id, status)",
            ),
            (
                "applications status index",
                "CREATE INDEX IF NOT EXISTS idx_applications_dorm_status \
                 ON rental_applications(dorm_id, action_status)",
            ),
            (
                "payments due index",
                "CREATE INDEX IF NOT EXISTS idx_payments_status_due ON payments(status, due_date)",
            ),
            (
                "transactions ledger index",
                "CREATE INDEX IF NOT EXISTS idx_transactions_owner_date \
                 ON transactions(owner_id, transaction_date)",
            ),
        ],
    )
    .await
}
