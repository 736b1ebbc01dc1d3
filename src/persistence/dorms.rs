//! Dorm listings owned by hosts, with their rooms and images.

use super::{store_error, StaySmartDb};
use crate::error::{Result, StaySmartError};
use crate::models::{Dorm, DormStatus, DormType, StatusFlow};
use serde::Serialize;
use sqlx::FromRow;
use tracing::debug;

/// A dorm as submitted by the "add property" form.
#[derive(Debug, Clone, Default)]
pub struct NewDorm {
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub dorm_type: DormType,
    pub status: DormStatus,
    pub rooms: Vec<NewRoom>,
    /// Stored upload paths; the first one becomes the main image.
    pub image_paths: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewRoom {
    pub room_no: String,
    pub room_type: Option<String>,
    pub capacity: i64,
    pub price_monthly: f64,
    pub amenity_ids: Vec<i64>,
}

/// Editable dorm fields.
#[derive(Debug, Clone)]
pub struct PropertyUpdate {
    pub name: String,
    pub address: String,
    pub dorm_type: DormType,
    pub status: DormStatus,
}

/// Row of the host's property list.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct HostProperty {
    pub property_id: i64,
    pub name: String,
    pub address: String,
    pub dorm_type: DormType,
    pub status: DormStatus,
    pub room_count: i64,
}

/// Inserts a dorm with its rooms, room amenities and images in one transaction.
pub async fn add_property(db: &StaySmartDb, owner_id: i64, dorm: &NewDorm) -> Result<i64> {
    let mut tx = db.begin().await?;

    let dorm_id = sqlx::query(
        "INSERT INTO dorms (owner_id, dorm_name, location_text, latitude, longitude, \
                            dorm_type, no_of_rooms, status) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(owner_id)
    .bind(&dorm.name)
    .bind(&dorm.address)
    .bind(dorm.latitude)
    .bind(dorm.longitude)
    .bind(dorm.dorm_type)
    .bind(dorm.rooms.len() as i64)
    .bind(dorm.status)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("add_property", e))?
    .last_insert_rowid();

    for room in &dorm.rooms {
        let room_id = sqlx::query(
            "INSERT INTO rooms \
             (dorm_id, room_no, room_type, capacity, price_monthly, is_available) \
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(dorm_id)
        .bind(&room.room_no)
        .bind(&room.room_type)
        .bind(room.capacity)
        .bind(room.price_monthly)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("add_property", e))?
        .last_insert_rowid();

        for amenity_id in &room.amenity_ids {
            sqlx::query("INSERT OR IGNORE INTO room_amenities (room_id, amenity_id) VALUES (?, ?)")
                .bind(room_id)
                .bind(amenity_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| store_error("add_property", e))?;
        }
    }

    for path in &dorm.image_paths {
        sqlx::query("INSERT INTO dorm_images (dorm_id, file_path) VALUES (?, ?)")
            .bind(dorm_id)
            .bind(path)
            .execute(&mut *tx)
            .await
            .map_err(|e| store_error("add_property", e))?;
    }

    tx.commit()
        .await
        .map_err(|e| store_error("add_property", e))?;

    debug!(dorm_id, owner_id, rooms = dorm.rooms.len(), "added property");
    Ok(dorm_id)
}

pub async fn get_dorm(db: &StaySmartDb, dorm_id: i64) -> Result<Option<Dorm>> {
    db.fetch_one(
        sqlx::query_as(
            "SELECT dorm_id, owner_id, dorm_name, location_text, latitude, longitude, \
                    dorm_type, no_of_rooms, status, created_at \
             FROM dorms WHERE dorm_id = ?",
        )
        .bind(dorm_id),
    )
    .await
}

pub async fn update_property(
    db: &StaySmartDb,
    dorm_id: i64,
    update: &PropertyUpdate,
) -> Result<()> {
    let changed = db
        .execute_count(
            sqlx::query(
                "UPDATE dorms SET dorm_name = ?, location_text = ?, dorm_type = ?, status = ? \
                 WHERE dorm_id = ?",
            )
            .bind(&update.name)
            .bind(&update.address)
            .bind(update.dorm_type)
            .bind(update.status)
            .bind(dorm_id),
        )
        .await?;

    if changed == 0 {
        return Err(StaySmartError::not_found("dorm", dorm_id));
    }
    debug!(dorm_id, "updated property");
    Ok(())
}

/// Deletes a dorm; its rooms, images and applications go with it.
pub async fn delete_property(db: &StaySmartDb, dorm_id: i64) -> Result<()> {
    let changed = db
        .execute_count(sqlx::query("DELETE FROM dorms WHERE dorm_id = ?").bind(dorm_id))
        .await?;

    if changed == 0 {
        return Err(StaySmartError::not_found("dorm", dorm_id));
    }
    debug!(dorm_id, "deleted property");
    Ok(())
}

pub async fn set_dorm_status(db: &StaySmartDb, dorm_id: i64, status: DormStatus) -> Result<()> {
    let mut tx = db.begin().await?;

    let current: Option<(DormStatus,)> =
        sqlx::query_as("SELECT status FROM dorms WHERE dorm_id = ?")
            .bind(dorm_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| store_error("set_dorm_status", e))?;
    let (current,) = current.ok_or_else(|| StaySmartError::not_found("dorm", dorm_id))?;
    current.ensure_transition(status)?;

    sqlx::query("UPDATE dorms SET status = ? WHERE dorm_id = ?")
        .bind(status)
        .bind(dorm_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("set_dorm_status", e))?;

    tx.commit()
        .await
        .map_err(|e| store_error("set_dorm_status", e))?;
    debug!(dorm_id, from = %current, to = %status, "dorm status changed");
    Ok(())
}

pub async fn get_host_properties(db: &StaySmartDb, owner_id: i64) -> Result<Vec<HostProperty>> {
    db.fetch_all(
        sqlx::query_as(
            r#"
            SELECT d.dorm_id AS property_id,
                   d.dorm_name AS name,
                   d.location_text AS address,
                   d.dorm_type,
                   d.status,
                   COUNT(r.room_id) AS room_count
            FROM dorms d
            LEFT JOIN rooms r ON d.dorm_id = r.dorm_id
            WHERE d.owner_id = ?
            GROUP BY d.dorm_id
            ORDER BY d.dorm_id
            "#,
        )
        .bind(owner_id),
    )
    .await
}

/// Path of the first image uploaded for the dorm.
pub async fn get_dorm_main_image(db: &StaySmartDb, dorm_id: i64) -> Result<Option<String>> {
    let row: Option<(String,)> = db
        .fetch_one(
            sqlx::query_as(
                "SELECT file_path FROM dorm_images WHERE dorm_id = ? ORDER BY image_id LIMIT 1",
            )
            .bind(dorm_id),
        )
        .await?;
    Ok(row.map(|(path,)| path))
}
