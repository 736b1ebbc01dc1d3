//! Room listings, amenities and tenant-side room search.
//!
//! A room takes as many occupying rentals as it has beds (`capacity`).
//! `is_available` is recomputed from that count whenever a rental opens or
//! ends, so listings only show rooms with a free bed.

use super::{store_error, StaySmartDb};
use crate::error::{Result, StaySmartError};
use crate::models::{Amenity, RentalStatus, Room};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::FromRow;
use tracing::{debug, warn};

/// Shared projection for every room list a tenant or host browses.
const LISTING_SELECT: &str = r#"
    SELECT r.room_id,
           d.dorm_id,
           d.owner_id AS host_id,
           d.dorm_name AS property_name,
           d.location_text AS address,
           r.room_no AS room_name,
           r.room_type,
           r.capacity,
           r.price_monthly,
           u.fullname AS host_name,
           u.contact_no AS host_phone,
           u.email AS host_email,
           op.facebook_link,
           op.messenger_link
    FROM rooms r
    JOIN dorms d ON r.dorm_id = d.dorm_id
    JOIN users u ON d.owner_id = u.user_id
    LEFT JOIN owner_profiles op ON op.owner_id = u.user_id
"#;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct RoomListing {
    pub room_id: i64,
    pub dorm_id: i64,
    pub host_id: i64,
    pub property_name: String,
    pub address: String,
    pub room_name: String,
    pub room_type: Option<String>,
    pub capacity: i64,
    pub price_monthly: f64,
    pub host_name: String,
    pub host_phone: Option<String>,
    pub host_email: String,
    pub facebook_link: Option<String>,
    pub messenger_link: Option<String>,
}

impl RoomListing {
    /// Card title, e.g. "Casa Verde - 101".
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.property_name, self.room_name)
    }
}

/// An occupied room on the host's dashboard.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct OccupiedRoom {
    pub room_id: i64,
    pub room_name: String,
    pub room_type: Option<String>,
    pub tenant_name: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: Option<NaiveDate>,
    pub dorm_name: String,
    pub dorm_id: i64,
}

/// Capacity dropdown of the room search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CapacityFilter {
    #[default]
    Any,
    Exactly(i64),
    AtLeast(i64),
}

impl CapacityFilter {
    /// Parses the dropdown labels "Any", "2" and "4+".
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("any") || label.is_empty() {
            return Some(Self::Any);
        }
        if let Some(min) = label.strip_suffix('+') {
            return min.parse().ok().map(Self::AtLeast);
        }
        label.parse().ok().map(Self::Exactly)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoomSearch {
    /// Matched against dorm name, address and room number.
    pub text: String,
    pub capacity: CapacityFilter,
}

pub async fn list_amenities(db: &StaySmartDb) -> Result<Vec<Amenity>> {
    db.fetch_all(sqlx::query_as(
        "SELECT amenity_id, label FROM amenities ORDER BY amenity_id",
    ))
    .await
}

/// Amenity labels of a room, alphabetically.
pub async fn get_room_amenities(db: &StaySmartDb, room_id: i64) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = db
        .fetch_all(
            sqlx::query_as(
                r#"
                SELECT a.label
                FROM room_amenities ra
                JOIN amenities a ON a.amenity_id = ra.amenity_id
                WHERE ra.room_id = ?
                ORDER BY a.label
                "#,
            )
            .bind(room_id),
        )
        .await?;
    Ok(rows.into_iter().map(|(label,)| label).collect())
}

pub async fn get_room(db: &StaySmartDb, room_id: i64) -> Result<Option<Room>> {
    db.fetch_one(
        sqlx::query_as(
            "SELECT room_id, dorm_id, room_no, room_type, capacity, price_monthly, is_available \
             FROM rooms WHERE room_id = ?",
        )
        .bind(room_id),
    )
    .await
}

/// Beds of a room and how many are taken, as seen inside one transaction.
#[derive(Debug, Clone, Copy, PartialEq, FromRow)]
pub(crate) struct RoomLoad {
    pub price_monthly: f64,
    pub capacity: i64,
    pub occupants: i64,
}

/// Reads the room's load inside `conn` and fails with `Conflict` when every
/// bed is taken.
pub(crate) async fn ensure_free_bed(
    conn: &mut SqliteConnection,
    room_id: i64,
) -> Result<RoomLoad> {
    let sql = format!(
        "SELECT r.price_monthly, r.capacity, \
                (SELECT COUNT(*) FROM rentals rr \
                  WHERE rr.room_id = r.room_id AND rr.status IN {}) AS occupants \
         FROM rooms r WHERE r.room_id = ?",
        RentalStatus::occupying_sql()
    );
    let load: Option<RoomLoad> = sqlx::query_as(&sql)
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| store_error("room load", e))?;
    let load = load.ok_or_else(|| StaySmartError::not_found("room", room_id))?;

    if load.occupants >= load.capacity {
        warn!(
            room_id,
            occupants = load.occupants,
            capacity = load.capacity,
            "room is full"
        );
        return Err(StaySmartError::conflict(format!(
            "Room {room_id} is full ({} of {} beds taken)",
            load.occupants, load.capacity
        )));
    }
    Ok(load)
}

/// Recomputes `is_available` from the room's occupying rentals inside `conn`.
pub(crate) async fn refresh_availability(conn: &mut SqliteConnection, room_id: i64) -> Result<()> {
    let sql = format!(
        "UPDATE rooms SET is_available = \
            ((SELECT COUNT(*) FROM rentals \
               WHERE room_id = ?1 AND status IN {}) < capacity) \
         WHERE room_id = ?1",
        RentalStatus::occupying_sql()
    );
    sqlx::query(&sql)
        .bind(room_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| store_error("refresh_availability", e))?;
    debug!(room_id, "room availability refreshed");
    Ok(())
}

/// Vacant rooms across all of the host's dorms.
pub async fn get_available_rooms_host(db: &StaySmartDb, owner_id: i64) -> Result<Vec<RoomListing>> {
    let sql = format!(
        "{LISTING_SELECT} WHERE d.owner_id = ? AND r.is_available = 1 ORDER BY d.dorm_id, r.room_no"
    );
    db.fetch_all(sqlx::query_as(&sql).bind(owner_id)).await
}

/// Rooms of the host with an occupying rental, newest check-in first.
pub async fn get_occupied_rooms_host(db: &StaySmartDb, owner_id: i64) -> Result<Vec<OccupiedRoom>> {
    let sql = format!(
        r#"
        SELECT r.room_id,
               r.room_no AS room_name,
               r.room_type,
               COALESCE(ad.tenant_fullname, u.fullname) AS tenant_name,
               rr.start_date AS check_in_date,
               rr.end_date AS check_out_date,
               d.dorm_name,
               d.dorm_id
        FROM rentals rr
        JOIN rooms r ON rr.room_id = r.room_id
        JOIN dorms d ON r.dorm_id = d.dorm_id
        JOIN users u ON rr.tenant_id = u.user_id
        LEFT JOIN application_details ad ON ad.application_id = rr.application_id
        WHERE d.owner_id = ?
          AND rr.status IN {}
        ORDER BY rr.start_date DESC, rr.rental_id DESC
        "#,
        RentalStatus::occupying_sql()
    );
    db.fetch_all(sqlx::query_as(&sql).bind(owner_id)).await
}

/// A random sample of rooms tenants can apply for.
pub async fn get_recommended_rooms(db: &StaySmartDb, limit: i64) -> Result<Vec<RoomListing>> {
    let sql = format!(
        "{LISTING_SELECT} WHERE r.is_available = 1 AND d.status = 'OPEN' ORDER BY RANDOM() LIMIT ?"
    );
    db.fetch_all(sqlx::query_as(&sql).bind(limit)).await
}

/// Open rooms in the most recently listed dorms.
pub async fn get_nearby_rooms(db: &StaySmartDb, limit: i64) -> Result<Vec<RoomListing>> {
    let sql = format!(
        "{LISTING_SELECT} WHERE r.is_available = 1 AND d.status = 'OPEN' \
         ORDER BY d.created_at DESC, d.dorm_id DESC, r.room_id LIMIT ?"
    );
    db.fetch_all(sqlx::query_as(&sql).bind(limit)).await
}

pub async fn search_rooms(db: &StaySmartDb, search: &RoomSearch) -> Result<Vec<RoomListing>> {
    let mut sql = format!("{LISTING_SELECT} WHERE r.is_available = 1 AND d.status = 'OPEN'");
    let text = search.text.trim();

    if !text.is_empty() {
        sql.push_str(" AND (d.dorm_name LIKE ? OR d.location_text LIKE ? OR r.room_no LIKE ?)");
    }
    match search.capacity {
        CapacityFilter::Any => {}
        CapacityFilter::Exactly(_) => sql.push_str(" AND r.capacity = ?"),
        CapacityFilter::AtLeast(_) => sql.push_str(" AND r.capacity >= ?"),
    }
    sql.push_str(" ORDER BY d.dorm_name, r.room_no");

    let mut query = sqlx::query_as::<_, RoomListing>(&sql);
    if !text.is_empty() {
        let pattern = format!("%{text}%");
        query = query.bind(pattern.clone()).bind(pattern.clone()).bind(pattern);
    }
    match search.capacity {
        CapacityFilter::Any => {}
        CapacityFilter::Exactly(n) | CapacityFilter::AtLeast(n) => query = query.bind(n),
    }

    db.fetch_all(query).await
}
