//! Opening, reopening and configuring the on-disk store.

use super::support::{account, count_rows, create_test_db};
use pretty_assertions::assert_eq;
use staysmart::config::{Config, DatabaseConfig, DatabaseLocation};
use staysmart::models::Role;
use staysmart::persistence::{rooms, users};
use staysmart::StaySmartDb;
use tempfile::tempdir;

async fn schema_version(db: &StaySmartDb) -> i32 {
    let (version,): (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_versions")
        .fetch_one(db.pool())
        .await
        .unwrap();
    version
}

#[tokio::test]
async fn test_reopen_keeps_data_and_schema() {
    let dir = tempdir().unwrap();
    let config = Config {
        database: DatabaseConfig::at_path(dir.path().join("nested").join("staysmart.db")),
        ..Default::default()
    };

    let db = StaySmartDb::open(&config).await.unwrap();
    let version = schema_version(&db).await;
    account(&db, Role::Tenant, "mika").await;
    db.close().await;

    let db = StaySmartDb::open(&config).await.unwrap();
    assert_eq!(schema_version(&db).await, version);
    assert_eq!(count_rows(&db, "schema_versions").await, i64::from(version));
    assert_eq!(count_rows(&db, "amenities").await, 8);
    assert!(users::username_exists(&db, "mika").await.unwrap());
    assert_eq!(
        db.location(),
        &DatabaseLocation::File(dir.path().join("nested").join("staysmart.db"))
    );
}

#[tokio::test]
async fn test_connection_string_target() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("from-url.db");

    let mut database = DatabaseConfig::default();
    database.set_target(&format!("sqlite://{}", path.display()));
    let config = Config {
        database,
        ..Default::default()
    };

    let db = StaySmartDb::open(&config).await.unwrap();
    assert_eq!(db.location(), &DatabaseLocation::File(path.clone()));
    assert!(path.exists());
    assert_eq!(rooms::list_amenities(&db).await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_in_memory_target() {
    let mut database = DatabaseConfig::at_path("/unused/staysmart.db");
    database.set_target("sqlite::memory:");
    let config = Config {
        database,
        ..Default::default()
    };

    let db = StaySmartDb::open(&config).await.unwrap();
    assert_eq!(db.location(), &DatabaseLocation::Memory);
    assert_eq!(count_rows(&db, "users").await, 0);
}

#[tokio::test]
async fn test_invalid_billing_config_refused() {
    let (_db, dir) = create_test_db().await;
    let mut config = Config {
        database: DatabaseConfig::at_path(dir.path().join("other.db")),
        ..Default::default()
    };
    config.billing.cycle_days = 0;

    assert!(StaySmartDb::open(&config).await.is_err());
    assert!(!dir.path().join("other.db").exists());
}
