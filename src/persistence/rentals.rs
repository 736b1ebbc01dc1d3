//! Rentals: a tenant occupying a room, from approval until move-out.

use super::{rooms, store_error, StaySmartDb};
use crate::error::{Result, StaySmartError};
use crate::models::{PaymentStatus, Rental, RentalStatus, StatusFlow};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::FromRow;
use tracing::{debug, info, warn};

/// A tenant currently living in one of the host's rooms.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct CurrentOccupant {
    pub rental_id: i64,
    pub tenant_id: i64,
    pub tenant_name: String,
    pub tenant_phone: Option<String>,
    pub dorm_name: String,
    pub room_no: String,
    pub start_date: NaiveDate,
    pub status: RentalStatus,
}

/// The next unpaid cycle of a tenant's current rental.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TenantDue {
    pub rental_id: i64,
    pub payment_id: i64,
    pub dorm_name: String,
    pub room_no: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
}

/// Opens an ACTIVE rental that did not come through an application.
///
/// Fails with `Conflict` when every bed in the room is already taken.
pub async fn create_rental(
    db: &StaySmartDb,
    tenant_id: i64,
    room_id: i64,
    start_date: NaiveDate,
) -> Result<i64> {
    let mut tx = db.begin().await?;
    rooms::ensure_free_bed(&mut tx, room_id).await?;

    let id = sqlx::query(
        "INSERT INTO rentals (tenant_id, room_id, status, start_date) \
         VALUES (?, ?, 'ACTIVE', ?)",
    )
    .bind(tenant_id)
    .bind(room_id)
    .bind(start_date)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("create_rental", e))?
    .last_insert_rowid();

    rooms::refresh_availability(&mut tx, room_id).await?;
    tx.commit()
        .await
        .map_err(|e| store_error("create_rental", e))?;

    debug!(rental_id = id, tenant_id, room_id, "rental created");
    Ok(id)
}

pub async fn get_rental(db: &StaySmartDb, rental_id: i64) -> Result<Option<Rental>> {
    db.fetch_one(
        sqlx::query_as(
            "SELECT rental_id, application_id, tenant_id, room_id, status, start_date, end_date \
             FROM rentals WHERE rental_id = ?",
        )
        .bind(rental_id),
    )
    .await
}

/// Occupants of the host's rooms, optionally filtered by tenant name.
pub async fn get_current_occupants(
    db: &StaySmartDb,
    owner_id: i64,
    search: &str,
) -> Result<Vec<CurrentOccupant>> {
    let mut sql = format!(
        r#"
        SELECT rr.rental_id,
               u.user_id AS tenant_id,
               COALESCE(tp.first_name || ' ' || tp.last_name, u.fullname) AS tenant_name,
               u.contact_no AS tenant_phone,
               d.dorm_name,
               r.room_no,
               rr.start_date,
               rr.status
        FROM rentals rr
        JOIN users u ON rr.tenant_id = u.user_id
        LEFT JOIN tenant_profiles tp ON tp.tenant_id = u.user_id
        JOIN rooms r ON rr.room_id = r.room_id
        JOIN dorms d ON r.dorm_id = d.dorm_id
        WHERE d.owner_id = ?
          AND rr.status IN {}
        "#,
        RentalStatus::occupying_sql()
    );

    let search = search.trim();
    if !search.is_empty() {
        sql.push_str(" AND COALESCE(tp.first_name || ' ' || tp.last_name, u.fullname) LIKE ?");
    }
    sql.push_str(" ORDER BY rr.start_date DESC, rr.rental_id DESC");

    let mut query = sqlx::query_as::<_, CurrentOccupant>(&sql).bind(owner_id);
    if !search.is_empty() {
        query = query.bind(format!("%{search}%"));
    }
    db.fetch_all(query).await
}

/// Earliest unpaid payment of the tenant's occupying rental.
pub async fn get_tenant_due(db: &StaySmartDb, tenant_id: i64) -> Result<Option<TenantDue>> {
    let sql = format!(
        r#"
        SELECT rr.rental_id,
               p.payment_id,
               d.dorm_name,
               r.room_no,
               p.amount_due - p.amount_paid AS amount,
               p.due_date,
               p.status
        FROM rentals rr
        JOIN payments p ON p.rental_id = rr.rental_id
        JOIN rooms r ON rr.room_id = r.room_id
        JOIN dorms d ON r.dorm_id = d.dorm_id
        WHERE rr.tenant_id = ?
          AND rr.status IN {}
          AND p.status <> 'PAID'
        ORDER BY p.due_date ASC, p.payment_id ASC
        LIMIT 1
        "#,
        RentalStatus::occupying_sql()
    );
    db.fetch_one(sqlx::query_as(&sql).bind(tenant_id)).await
}

/// Reads the rental's status and room inside `conn`.
async fn rental_state(
    conn: &mut SqliteConnection,
    rental_id: i64,
) -> Result<(RentalStatus, i64, NaiveDate)> {
    let row: Option<(RentalStatus, i64, NaiveDate)> =
        sqlx::query_as("SELECT status, room_id, start_date FROM rentals WHERE rental_id = ?")
            .bind(rental_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| store_error("rental transition", e))?;
    row.ok_or_else(|| StaySmartError::not_found("rental", rental_id))
}

fn check(rental_id: i64, from: RentalStatus, to: RentalStatus) -> Result<()> {
    from.ensure_transition(to).inspect_err(|e| warn!(rental_id, "{e}"))
}

/// Ends a rental and frees its bed; the room is listed again once it has
/// fewer occupants than beds.
///
/// Ending an already ENDED rental succeeds and keeps its original end date.
pub async fn end_rental(db: &StaySmartDb, rental_id: i64, today: NaiveDate) -> Result<()> {
    let mut tx = db.begin().await?;

    let (status, room_id, _) = rental_state(&mut tx, rental_id).await?;
    if status != RentalStatus::Ended {
        check(rental_id, status, RentalStatus::Ended)?;
    }

    sqlx::query(
        "UPDATE rentals SET status = 'ENDED', end_date = COALESCE(end_date, ?) \
         WHERE rental_id = ?",
    )
    .bind(today)
    .bind(rental_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("end_rental", e))?;

    rooms::refresh_availability(&mut tx, room_id).await?;

    tx.commit().await.map_err(|e| store_error("end_rental", e))?;

    info!(rental_id, room_id, "rental ended");
    Ok(())
}

/// Moves the rental's end date out to `new_end_date`.
pub async fn extend_rental(
    db: &StaySmartDb,
    rental_id: i64,
    new_end_date: NaiveDate,
) -> Result<()> {
    let mut tx = db.begin().await?;

    let (status, _, start_date) = rental_state(&mut tx, rental_id).await?;
    check(rental_id, status, RentalStatus::Extended)?;
    if new_end_date <= start_date {
        return Err(StaySmartError::conflict(format!(
            "Rental {rental_id} cannot end on {new_end_date}, before its start on {start_date}"
        )));
    }

    sqlx::query("UPDATE rentals SET status = 'EXTENDED', end_date = ? WHERE rental_id = ?")
        .bind(new_end_date)
        .bind(rental_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("extend_rental", e))?;

    tx.commit()
        .await
        .map_err(|e| store_error("extend_rental", e))?;

    debug!(rental_id, %new_end_date, "rental extended");
    Ok(())
}

/// Flags a rental whose tenant has given notice.
pub async fn mark_rental_ending(db: &StaySmartDb, rental_id: i64) -> Result<()> {
    let mut tx = db.begin().await?;

    let (status, _, _) = rental_state(&mut tx, rental_id).await?;
    check(rental_id, status, RentalStatus::Ending)?;

    sqlx::query("UPDATE rentals SET status = 'ENDING' WHERE rental_id = ?")
        .bind(rental_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("mark_rental_ending", e))?;

    tx.commit()
        .await
        .map_err(|e| store_error("mark_rental_ending", e))?;

    debug!(rental_id, "rental ending");
    Ok(())
}
