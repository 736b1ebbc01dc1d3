//! Per-cycle rent payments and the billing sweeps that age them.

use super::{add_days, store_error, StaySmartDb};
use crate::error::{Result, StaySmartError};
use crate::models::{Payment, PaymentStatus, StatusFlow};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::sqlite::SqliteExecutor;
use sqlx::FromRow;
use tracing::{debug, info, warn};

const PAYMENT_COLUMNS: &str =
    "payment_id, rental_id, due_date, amount_due, amount_paid, status, paid_at";

/// A payment row as the tenant's payments page lists it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TenantPayment {
    pub payment_id: i64,
    pub rental_id: i64,
    pub due_date: NaiveDate,
    pub amount_due: f64,
    pub amount_paid: f64,
    pub status: PaymentStatus,
    pub payment_date: Option<NaiveDateTime>,
    pub room_name: String,
    pub property_name: String,
}

/// Inserts an unpaid PENDING payment through any executor.
pub(crate) async fn insert_payment<'e, E>(
    executor: E,
    rental_id: i64,
    due_date: NaiveDate,
    amount_due: f64,
) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let id = sqlx::query(
        "INSERT INTO payments (rental_id, due_date, amount_due, amount_paid, status) \
         VALUES (?, ?, ?, 0, 'PENDING')",
    )
    .bind(rental_id)
    .bind(due_date)
    .bind(amount_due)
    .execute(executor)
    .await
    .map_err(|e| store_error("insert_payment", e))?
    .last_insert_rowid();

    debug!(payment_id = id, rental_id, %due_date, amount_due, "payment scheduled");
    Ok(id)
}

/// Schedules a payment for one billing cycle of a rental.
pub async fn create_monthly_payment(
    db: &StaySmartDb,
    rental_id: i64,
    due_date: NaiveDate,
    amount_due: f64,
) -> Result<i64> {
    insert_payment(db.pool(), rental_id, due_date, amount_due).await
}

pub async fn get_payment(db: &StaySmartDb, payment_id: i64) -> Result<Option<Payment>> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = ?");
    db.fetch_one(sqlx::query_as(&sql).bind(payment_id)).await
}

/// Every payment of a rental, earliest due date first.
pub async fn get_rental_payments(db: &StaySmartDb, rental_id: i64) -> Result<Vec<Payment>> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE rental_id = ? ORDER BY due_date, payment_id"
    );
    db.fetch_all(sqlx::query_as(&sql).bind(rental_id)).await
}

pub async fn get_user_payments(db: &StaySmartDb, tenant_id: i64) -> Result<Vec<TenantPayment>> {
    db.fetch_all(
        sqlx::query_as(
            r#"
            SELECT p.payment_id,
                   p.rental_id,
                   p.due_date,
                   p.amount_due,
                   p.amount_paid,
                   p.status,
                   p.paid_at AS payment_date,
                   r.room_no AS room_name,
                   d.dorm_name AS property_name
            FROM payments p
            JOIN rentals rr ON p.rental_id = rr.rental_id
            JOIN rooms r ON rr.room_id = r.room_id
            JOIN dorms d ON r.dorm_id = d.dorm_id
            WHERE rr.tenant_id = ?
            ORDER BY p.due_date ASC, p.payment_id ASC
            "#,
        )
        .bind(tenant_id),
    )
    .await
}

/// Settles a payment. Without an explicit amount the full amount due is recorded.
pub async fn mark_payment_paid(
    db: &StaySmartDb,
    payment_id: i64,
    amount_paid: Option<f64>,
) -> Result<()> {
    let mut tx = db.begin().await?;

    let row: Option<(PaymentStatus, f64)> =
        sqlx::query_as("SELECT status, amount_due FROM payments WHERE payment_id = ?")
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| store_error("mark_payment_paid", e))?;
    let (status, amount_due) = row.ok_or_else(|| StaySmartError::not_found("payment", payment_id))?;

    if let Err(e) = status.ensure_transition(PaymentStatus::Paid) {
        warn!(payment_id, "{e}");
        return Err(e);
    }

    let amount = amount_paid.unwrap_or(amount_due);
    sqlx::query(
        "UPDATE payments SET amount_paid = ?, status = 'PAID', paid_at = datetime('now') \
         WHERE payment_id = ?",
    )
    .bind(amount)
    .bind(payment_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("mark_payment_paid", e))?;

    tx.commit()
        .await
        .map_err(|e| store_error("mark_payment_paid", e))?;

    debug!(payment_id, amount, "payment marked paid");
    Ok(())
}

/// Flags unpaid PENDING or DUE payments whose due date is before `today`.
/// Returns the number of payments that became OVERDUE.
pub async fn mark_overdue_payments(db: &StaySmartDb, today: NaiveDate) -> Result<u64> {
    let count = db
        .execute_count(
            sqlx::query(
                "UPDATE payments SET status = 'OVERDUE' \
                 WHERE status IN ('PENDING', 'DUE') AND due_date < ?",
            )
            .bind(today),
        )
        .await?;

    if count > 0 {
        info!(count, %today, "payments marked overdue");
    }
    Ok(count)
}

/// Promotes PENDING payments falling due within `lead_days` of `today` to DUE.
pub async fn mark_due_payments(
    db: &StaySmartDb,
    today: NaiveDate,
    lead_days: i64,
) -> Result<u64> {
    let horizon = add_days(today, lead_days)?;
    let count = db
        .execute_count(
            sqlx::query(
                "UPDATE payments SET status = 'DUE' WHERE status = 'PENDING' AND due_date <= ?",
            )
            .bind(horizon),
        )
        .await?;

    if count > 0 {
        info!(count, %horizon, "payments now due");
    }
    Ok(count)
}
