//! Rental applications: tenant submissions and the host's review of them.
//!
//! Approval is the one place where several tables change together, so it
//! runs as a single transaction: the application is stamped, the rental is
//! opened on a free bed, the room's availability is recomputed and the first
//! payment is scheduled. Any failure rolls all of it back and the application stays
//! `WAITING`.

use super::{add_days, payments, rooms, store_error, StaySmartDb};
use crate::error::{Result, StaySmartError};
use crate::models::{
    ApplicationDetails, ApplicationStatus, RentalApplication, RentalStatus, StatusFlow,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::FromRow;
use tracing::{debug, info, warn};

/// Application form as the tenant submits it.
#[derive(Debug, Clone, Default)]
pub struct NewApplication {
    pub tenant_id: i64,
    pub dorm_id: i64,
    pub room_id: i64,
    pub notes: Option<String>,
    pub tenant_fullname: Option<String>,
    pub tenant_email: Option<String>,
    pub tenant_phone: Option<String>,
    pub tenant_gender: Option<String>,
}

/// WAITING application shown in the host's request queue.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PendingRequest {
    pub request_id: i64,
    pub applicant: String,
    pub dorm: String,
    pub room_name: String,
    pub room_type: Option<String>,
    pub submitted_at: NaiveDateTime,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct RecentReservation {
    pub application_id: i64,
    pub created_at: NaiveDateTime,
    pub full_name: String,
    pub room_name: String,
    pub status: ApplicationStatus,
}

/// A tenant's own application history.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct UserReservation {
    pub application_id: i64,
    pub property_name: String,
    pub room_name: String,
    pub status: ApplicationStatus,
    pub created_at: NaiveDateTime,
}

/// Inserts the application and its form details together.
pub async fn create_rental_application(db: &StaySmartDb, app: &NewApplication) -> Result<i64> {
    let mut tx = db.begin().await?;

    let application_id = sqlx::query(
        "INSERT INTO rental_applications (tenant_id, dorm_id, room_id) VALUES (?, ?, ?)",
    )
    .bind(app.tenant_id)
    .bind(app.dorm_id)
    .bind(app.room_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("create_rental_application", e))?
    .last_insert_rowid();

    sqlx::query(
        r#"
        INSERT INTO application_details (
            application_id, additional_notes, tenant_fullname,
            tenant_email, tenant_phone, tenant_gender
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(application_id)
    .bind(&app.notes)
    .bind(&app.tenant_fullname)
    .bind(&app.tenant_email)
    .bind(&app.tenant_phone)
    .bind(&app.tenant_gender)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("create_rental_application", e))?;

    tx.commit()
        .await
        .map_err(|e| store_error("create_rental_application", e))?;

    debug!(
        application_id,
        tenant_id = app.tenant_id,
        room_id = app.room_id,
        "application submitted"
    );
    Ok(application_id)
}

pub async fn get_application(
    db: &StaySmartDb,
    application_id: i64,
) -> Result<Option<RentalApplication>> {
    db.fetch_one(
        sqlx::query_as(
            "SELECT application_id, tenant_id, dorm_id, room_id, action_status, remarks, \
                    submitted_at, reviewed_at \
             FROM rental_applications WHERE application_id = ?",
        )
        .bind(application_id),
    )
    .await
}

pub async fn get_application_details(
    db: &StaySmartDb,
    application_id: i64,
) -> Result<Option<ApplicationDetails>> {
    db.fetch_one(
        sqlx::query_as(
            "SELECT application_id, additional_notes, tenant_fullname, tenant_email, \
                    tenant_phone, tenant_gender \
             FROM application_details WHERE application_id = ?",
        )
        .bind(application_id),
    )
    .await
}

/// WAITING applications for the host's dorms, newest first.
pub async fn get_pending_requests(db: &StaySmartDb, owner_id: i64) -> Result<Vec<PendingRequest>> {
    db.fetch_all(
        sqlx::query_as(
            r#"
            SELECT ra.application_id AS request_id,
                   COALESCE(ad.tenant_fullname, u.fullname) AS applicant,
                   d.dorm_name AS dorm,
                   r.room_no AS room_name,
                   r.room_type,
                   ra.submitted_at,
                   ra.action_status AS status
            FROM rental_applications ra
            JOIN users u ON ra.tenant_id = u.user_id
            LEFT JOIN application_details ad ON ad.application_id = ra.application_id
            JOIN dorms d ON ra.dorm_id = d.dorm_id
            JOIN rooms r ON ra.room_id = r.room_id
            WHERE d.owner_id = ? AND ra.action_status = 'WAITING'
            ORDER BY ra.submitted_at DESC, ra.application_id DESC
            "#,
        )
        .bind(owner_id),
    )
    .await
}

pub async fn get_recent_reservations(
    db: &StaySmartDb,
    owner_id: i64,
    limit: i64,
) -> Result<Vec<RecentReservation>> {
    db.fetch_all(
        sqlx::query_as(
            r#"
            SELECT ra.application_id,
                   ra.submitted_at AS created_at,
                   u.fullname AS full_name,
                   r.room_no AS room_name,
                   ra.action_status AS status
            FROM rental_applications ra
            JOIN users u ON ra.tenant_id = u.user_id
            JOIN rooms r ON ra.room_id = r.room_id
            JOIN dorms d ON ra.dorm_id = d.dorm_id
            WHERE d.owner_id = ?
            ORDER BY ra.submitted_at DESC, ra.application_id DESC
            LIMIT ?
            "#,
        )
        .bind(owner_id)
        .bind(limit),
    )
    .await
}

pub async fn get_user_reservations(
    db: &StaySmartDb,
    tenant_id: i64,
) -> Result<Vec<UserReservation>> {
    db.fetch_all(
        sqlx::query_as(
            r#"
            SELECT ra.application_id,
                   d.dorm_name AS property_name,
                   r.room_no AS room_name,
                   ra.action_status AS status,
                   ra.submitted_at AS created_at
            FROM rental_applications ra
            JOIN dorms d ON ra.dorm_id = d.dorm_id
            JOIN rooms r ON ra.room_id = r.room_id
            WHERE ra.tenant_id = ?
            ORDER BY ra.submitted_at DESC, ra.application_id DESC
            "#,
        )
        .bind(tenant_id),
    )
    .await
}

/// True while the tenant occupies a room or has an application awaiting review.
pub async fn user_has_active_reservation(db: &StaySmartDb, tenant_id: i64) -> Result<bool> {
    let sql = format!(
        r#"
        SELECT 1 FROM rentals
        WHERE tenant_id = ?1 AND status IN {occupying}
        UNION ALL
        SELECT 1 FROM rental_applications
        WHERE tenant_id = ?1 AND action_status = 'WAITING'
        LIMIT 1
        "#,
        occupying = RentalStatus::occupying_sql(),
    );
    let row: Option<(i64,)> = db.fetch_one(sqlx::query_as(&sql).bind(tenant_id)).await?;
    Ok(row.is_some())
}

/// Reads the application's status inside `conn` and checks the move to `next`.
async fn guard_transition(
    conn: &mut SqliteConnection,
    application_id: i64,
    next: ApplicationStatus,
) -> Result<(i64, i64)> {
    let row: Option<(i64, i64, ApplicationStatus)> = sqlx::query_as(
        "SELECT tenant_id, room_id, action_status FROM rental_applications \
         WHERE application_id = ?",
    )
    .bind(application_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| store_error("application transition", e))?;

    let (tenant_id, room_id, current) =
        row.ok_or_else(|| StaySmartError::not_found("application", application_id))?;

    if let Err(e) = current.ensure_transition(next) {
        warn!(application_id, "{e}");
        return Err(e);
    }
    Ok((tenant_id, room_id))
}

/// Writes the new status, failing if another writer already moved the row.
async fn write_status(
    conn: &mut SqliteConnection,
    application_id: i64,
    next: ApplicationStatus,
    remarks: Option<&str>,
) -> Result<()> {
    let done = sqlx::query(
        "UPDATE rental_applications \
         SET action_status = ?, remarks = COALESCE(?, remarks), reviewed_at = datetime('now') \
         WHERE application_id = ? AND action_status = 'WAITING'",
    )
    .bind(next)
    .bind(remarks)
    .bind(application_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| store_error("application transition", e))?;

    if done.rows_affected() == 0 {
        return Err(StaySmartError::invalid_transition(
            ApplicationStatus::ENTITY,
            "a reviewed state",
            next,
        ));
    }
    Ok(())
}

/// Approves a WAITING application and opens the rental that comes with it.
///
/// Returns the new rental id. The first payment falls due one billing cycle
/// after `start_date` at the room's monthly price. Fails with `Conflict`
/// when every bed in the room is already occupied.
pub async fn approve_application(
    db: &StaySmartDb,
    application_id: i64,
    start_date: NaiveDate,
) -> Result<i64> {
    let mut tx = db.begin().await?;

    let (tenant_id, room_id) =
        guard_transition(&mut tx, application_id, ApplicationStatus::Approved).await?;
    write_status(&mut tx, application_id, ApplicationStatus::Approved, None).await?;

    let room = rooms::ensure_free_bed(&mut tx, room_id).await?;

    let rental_id = sqlx::query(
        "INSERT INTO rentals (application_id, tenant_id, room_id, status, start_date) \
         VALUES (?, ?, ?, 'ACTIVE', ?)",
    )
    .bind(application_id)
    .bind(tenant_id)
    .bind(room_id)
    .bind(start_date)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("approve_application", e))?
    .last_insert_rowid();

    rooms::refresh_availability(&mut tx, room_id).await?;

    let first_due = add_days(start_date, db.billing().cycle_days)?;
    payments::insert_payment(&mut *tx, rental_id, first_due, room.price_monthly).await?;

    tx.commit()
        .await
        .map_err(|e| store_error("approve_application", e))?;

    info!(application_id, rental_id, room_id, %first_due, "application approved");
    Ok(rental_id)
}

/// Rejects a WAITING application, keeping the host's remarks.
pub async fn reject_application(
    db: &StaySmartDb,
    application_id: i64,
    remarks: Option<&str>,
) -> Result<()> {
    let mut tx = db.begin().await?;
    guard_transition(&mut tx, application_id, ApplicationStatus::Rejected).await?;
    write_status(&mut tx, application_id, ApplicationStatus::Rejected, remarks).await?;
    tx.commit()
        .await
        .map_err(|e| store_error("reject_application", e))?;

    debug!(application_id, "application rejected");
    Ok(())
}

/// Withdraws a WAITING application on the tenant's behalf.
pub async fn cancel_application(db: &StaySmartDb, application_id: i64) -> Result<()> {
    let mut tx = db.begin().await?;
    guard_transition(&mut tx, application_id, ApplicationStatus::Cancelled).await?;
    write_status(&mut tx, application_id, ApplicationStatus::Cancelled, None).await?;
    tx.commit()
        .await
        .map_err(|e| store_error("cancel_application", e))?;

    debug!(application_id, "application cancelled");
    Ok(())
}
