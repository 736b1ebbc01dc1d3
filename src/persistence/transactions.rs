//! The host's earnings ledger.

use super::{store_error, StaySmartDb};
use crate::error::Result;
use crate::models::{Transaction, TransactionStatus};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteExecutor;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub owner_id: i64,
    pub tenant_id: i64,
    pub rental_id: Option<i64>,
    pub amount: f64,
    pub status: TransactionStatus,
    pub transaction_date: NaiveDate,
}

impl NewTransaction {
    /// A settled payment received on `date`.
    pub fn paid(
        owner_id: i64,
        tenant_id: i64,
        rental_id: Option<i64>,
        amount: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            owner_id,
            tenant_id,
            rental_id,
            amount,
            status: TransactionStatus::Paid,
            transaction_date: date,
        }
    }
}

pub(crate) async fn insert_transaction<'e, E>(executor: E, entry: &NewTransaction) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let id = sqlx::query(
        "INSERT INTO transactions \
         (owner_id, tenant_id, rental_id, amount, status, transaction_date) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.owner_id)
    .bind(entry.tenant_id)
    .bind(entry.rental_id)
    .bind(entry.amount)
    .bind(entry.status)
    .bind(entry.transaction_date)
    .execute(executor)
    .await
    .map_err(|e| store_error("insert_transaction", e))?
    .last_insert_rowid();

    debug!(
        transaction_id = id,
        owner_id = entry.owner_id,
        amount = entry.amount,
        "ledger entry recorded"
    );
    Ok(id)
}

/// Appends an entry to the ledger and returns its id.
pub async fn record_transaction(db: &StaySmartDb, entry: &NewTransaction) -> Result<i64> {
    insert_transaction(db.pool(), entry).await
}

pub async fn get_transaction(db: &StaySmartDb, transaction_id: i64) -> Result<Option<Transaction>> {
    db.fetch_one(
        sqlx::query_as(
            "SELECT transaction_id, owner_id, tenant_id, rental_id, amount, status, \
                    transaction_date \
             FROM transactions WHERE transaction_id = ?",
        )
        .bind(transaction_id),
    )
    .await
}
