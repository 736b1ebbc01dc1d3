//! Tenant-submitted proof of payment and the host's review of it.
//!
//! Approving a request settles the rental's earliest unpaid cycle, writes
//! the earnings ledger and schedules the following cycle, all in one
//! transaction.

use super::{add_days, payments, store_error, transactions, StaySmartDb};
use crate::error::{Result, StaySmartError};
use crate::models::{PaymentRequest, PaymentRequestStatus, PaymentStatus, RentalStatus, StatusFlow};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{debug, info, warn};

/// A request awaiting the host's decision.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PendingPaymentRequest {
    pub request_id: i64,
    pub tenant_id: i64,
    pub tenant_name: String,
    pub rental_id: i64,
    pub amount: f64,
    pub proof_image: Option<String>,
    pub submitted_at: NaiveDateTime,
}

/// Files a payment request. Only one request per rental may await review.
pub async fn submit_payment_request(
    db: &StaySmartDb,
    tenant_id: i64,
    rental_id: i64,
    amount: f64,
    proof_image: Option<&str>,
) -> Result<i64> {
    let mut tx = db.begin().await?;

    let pending: Option<(i64,)> = sqlx::query_as(
        "SELECT request_id FROM payment_requests \
         WHERE tenant_id = ? AND rental_id = ? AND status = 'PENDING' LIMIT 1",
    )
    .bind(tenant_id)
    .bind(rental_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| store_error("submit_payment_request", e))?;

    if let Some((existing,)) = pending {
        debug!(tenant_id, rental_id, existing, "duplicate payment request refused");
        return Err(StaySmartError::conflict(format!(
            "Payment request {existing} for rental {rental_id} is still awaiting review"
        )));
    }

    let request_id = sqlx::query(
        "INSERT INTO payment_requests (tenant_id, rental_id, amount, proof_image) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(tenant_id)
    .bind(rental_id)
    .bind(amount)
    .bind(proof_image)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("submit_payment_request", e))?
    .last_insert_rowid();

    tx.commit()
        .await
        .map_err(|e| store_error("submit_payment_request", e))?;

    debug!(request_id, tenant_id, rental_id, amount, "payment request submitted");
    Ok(request_id)
}

pub async fn get_payment_request(
    db: &StaySmartDb,
    request_id: i64,
) -> Result<Option<PaymentRequest>> {
    db.fetch_one(
        sqlx::query_as(
            "SELECT request_id, tenant_id, rental_id, amount, proof_image, status, remarks, \
                    submitted_at, reviewed_at \
             FROM payment_requests WHERE request_id = ?",
        )
        .bind(request_id),
    )
    .await
}

/// Requests for the host's rentals, oldest first.
pub async fn get_pending_payment_requests(
    db: &StaySmartDb,
    owner_id: i64,
) -> Result<Vec<PendingPaymentRequest>> {
    db.fetch_all(
        sqlx::query_as(
            r#"
            SELECT pr.request_id,
                   pr.tenant_id,
                   u.fullname AS tenant_name,
                   pr.rental_id,
                   pr.amount,
                   pr.proof_image,
                   pr.submitted_at
            FROM payment_requests pr
            JOIN rentals rr ON pr.rental_id = rr.rental_id
            JOIN rooms r ON rr.room_id = r.room_id
            JOIN dorms d ON r.dorm_id = d.dorm_id
            JOIN users u ON pr.tenant_id = u.user_id
            WHERE d.owner_id = ? AND pr.status = 'PENDING'
            ORDER BY pr.submitted_at ASC, pr.request_id ASC
            "#,
        )
        .bind(owner_id),
    )
    .await
}

pub async fn has_pending_payment_request(
    db: &StaySmartDb,
    tenant_id: i64,
    rental_id: i64,
) -> Result<bool> {
    let row: Option<(i64,)> = db
        .fetch_one(
            sqlx::query_as(
                "SELECT 1 FROM payment_requests \
                 WHERE tenant_id = ? AND rental_id = ? AND status = 'PENDING' LIMIT 1",
            )
            .bind(tenant_id)
            .bind(rental_id),
        )
        .await?;
    Ok(row.is_some())
}

/// Host remarks on the most recently rejected request, if any.
pub async fn get_last_payment_rejection(
    db: &StaySmartDb,
    tenant_id: i64,
    rental_id: i64,
) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> = db
        .fetch_one(
            sqlx::query_as(
                "SELECT remarks FROM payment_requests \
                 WHERE tenant_id = ? AND rental_id = ? AND status = 'REJECTED' \
                 ORDER BY reviewed_at DESC, request_id DESC LIMIT 1",
            )
            .bind(tenant_id)
            .bind(rental_id),
        )
        .await?;
    Ok(row.and_then(|(remarks,)| remarks))
}

/// Approves or rejects a PENDING request.
///
/// On approval the rental's earliest unpaid payment is settled with the
/// requested amount, a PAID transaction dated `today` is added to the
/// host's ledger, and while the rental is still occupied the next cycle's
/// payment is scheduled one billing cycle after the settled one.
pub async fn review_payment_request(
    db: &StaySmartDb,
    request_id: i64,
    approve: bool,
    remarks: Option<&str>,
    today: NaiveDate,
) -> Result<()> {
    let next = if approve {
        PaymentRequestStatus::Approved
    } else {
        PaymentRequestStatus::Rejected
    };

    let mut tx = db.begin().await?;

    let row: Option<(i64, i64, f64, PaymentRequestStatus)> = sqlx::query_as(
        "SELECT tenant_id, rental_id, amount, status FROM payment_requests WHERE request_id = ?",
    )
    .bind(request_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| store_error("review_payment_request", e))?;
    let (tenant_id, rental_id, amount, current) =
        row.ok_or_else(|| StaySmartError::not_found("payment request", request_id))?;

    if let Err(e) = current.ensure_transition(next) {
        warn!(request_id, "{e}");
        return Err(e);
    }

    let done = sqlx::query(
        "UPDATE payment_requests \
         SET status = ?, remarks = COALESCE(?, remarks), reviewed_at = datetime('now') \
         WHERE request_id = ? AND status = 'PENDING'",
    )
    .bind(next)
    .bind(remarks)
    .bind(request_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| store_error("review_payment_request", e))?;
    if done.rows_affected() == 0 {
        return Err(StaySmartError::invalid_transition(
            PaymentRequestStatus::ENTITY,
            "a reviewed state",
            next,
        ));
    }

    if !approve {
        tx.commit()
            .await
            .map_err(|e| store_error("review_payment_request", e))?;
        debug!(request_id, "payment request rejected");
        return Ok(());
    }

    let rental: Option<(i64, RentalStatus, f64)> = sqlx::query_as(
        r#"
        SELECT d.owner_id, rr.status, r.price_monthly
        FROM rentals rr
        JOIN rooms r ON rr.room_id = r.room_id
        JOIN dorms d ON r.dorm_id = d.dorm_id
        WHERE rr.rental_id = ?
        "#,
    )
    .bind(rental_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| store_error("review_payment_request", e))?;
    let (owner_id, rental_status, price) =
        rental.ok_or_else(|| StaySmartError::not_found("rental", rental_id))?;

    let unpaid: Option<(i64, NaiveDate, PaymentStatus)> = sqlx::query_as(
        "SELECT payment_id, due_date, status FROM payments \
         WHERE rental_id = ? AND status <> 'PAID' \
         ORDER BY due_date ASC, payment_id ASC LIMIT 1",
    )
    .bind(rental_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| store_error("review_payment_request", e))?;

    if let Some((payment_id, due_date, status)) = unpaid {
        status.ensure_transition(PaymentStatus::Paid)?;
        sqlx::query(
            "UPDATE payments SET amount_paid = ?, status = 'PAID', paid_at = datetime('now') \
             WHERE payment_id = ?",
        )
        .bind(amount)
        .bind(payment_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("review_payment_request", e))?;

        let next_due = add_days(due_date, db.billing().cycle_days)?;
        let (later,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM payments WHERE rental_id = ? AND due_date > ?",
        )
        .bind(rental_id)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| store_error("review_payment_request", e))?;

        if rental_status.is_occupying() && later == 0 {
            payments::insert_payment(&mut *tx, rental_id, next_due, price).await?;
        }
    } else {
        debug!(rental_id, "approved payment has no open cycle to settle");
    }

    transactions::insert_transaction(
        &mut *tx,
        &transactions::NewTransaction::paid(owner_id, tenant_id, Some(rental_id), amount, today),
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| store_error("review_payment_request", e))?;

    info!(request_id, rental_id, amount, "payment request approved");
    Ok(())
}
