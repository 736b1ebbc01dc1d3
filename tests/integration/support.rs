//! Shared fixtures for the integration tests.

use chrono::NaiveDate;
use staysmart::auth::{self, SignupRequest};
use staysmart::config::{Config, DatabaseConfig};
use staysmart::models::{DormStatus, DormType, Role};
use staysmart::persistence::{dorms, NewDorm, NewRoom};
use staysmart::StaySmartDb;
use tempfile::{tempdir, TempDir};

/// Opens a fresh file-backed store. Keep the directory alive for the test.
pub async fn create_test_db() -> (StaySmartDb, TempDir) {
    let dir = tempdir().unwrap();
    let config = Config {
        database: DatabaseConfig::at_path(dir.path().join("staysmart.db")),
        ..Default::default()
    };
    let db = StaySmartDb::open(&config).await.unwrap();
    (db, dir)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn signup_request(username: &str) -> SignupRequest {
    SignupRequest {
        fullname: format!("{username} test"),
        username: username.to_string(),
        contact_no: None,
        email: format!("{username}@staysmart.test"),
        password: format!("{username}-password"),
    }
}

/// Signs up an account through the auth layer and returns its id.
pub async fn account(db: &StaySmartDb, role: Role, username: &str) -> i64 {
    let outcome = auth::signup(db, role, &signup_request(username))
        .await
        .unwrap();
    assert!(outcome.success, "{}", outcome.message);
    outcome.user_id.unwrap()
}

/// Lists an open dorm with one room per `(capacity, price)`; returns dorm and room ids.
pub async fn listed_dorm(
    db: &StaySmartDb,
    owner_id: i64,
    name: &str,
    rooms: &[(i64, f64)],
) -> (i64, Vec<i64>) {
    let dorm = NewDorm {
        name: name.to_string(),
        address: "Katipunan Ave".to_string(),
        latitude: None,
        longitude: None,
        dorm_type: DormType::Mixed,
        status: DormStatus::Open,
        rooms: rooms
            .iter()
            .enumerate()
            .map(|(i, &(capacity, price))| NewRoom {
                room_no: format!("{}", 101 + i),
                room_type: None,
                capacity,
                price_monthly: price,
                amenity_ids: vec![1],
            })
            .collect(),
        image_paths: vec![format!("uploads/{name}.jpg")],
    };
    let dorm_id = dorms::add_property(db, owner_id, &dorm).await.unwrap();

    let room_ids: Vec<(i64,)> =
        sqlx::query_as("SELECT room_id FROM rooms WHERE dorm_id = ? ORDER BY room_id")
            .bind(dorm_id)
            .fetch_all(db.pool())
            .await
            .unwrap();
    (dorm_id, room_ids.into_iter().map(|(id,)| id).collect())
}

pub async fn count_rows(db: &StaySmartDb, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap();
    n
}
