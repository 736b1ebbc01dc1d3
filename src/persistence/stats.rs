//! Dashboard aggregates for hosts and tenants.
//!
//! Every aggregate defaults to zero when nothing matches: counts come from
//! `COUNT(*)` and money from `TOTAL()`, which is `0.0` rather than NULL on
//! an empty set. Month and year buckets are filled in Rust so callers always
//! get complete series.

use super::{add_days, StaySmartDb};
use crate::error::Result;
use crate::models::{RentalStatus, TransactionStatus};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use sqlx::FromRow;

/// Rentals of the host that still hold a room. Binds `owner_id` once.
fn occupying_rentals() -> String {
    format!(
        "FROM rentals rr \
         JOIN rooms r ON rr.room_id = r.room_id \
         JOIN dorms d ON r.dorm_id = d.dorm_id \
         WHERE d.owner_id = ? AND rr.status IN {}",
        RentalStatus::occupying_sql()
    )
}

/// Headline numbers of the host dashboard.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct OwnerStats {
    pub total_dorms: i64,
    pub current_occupants: i64,
    pub pending_requests: i64,
    pub monthly_earnings: f64,
    pub active_dorms: i64,
    pub maintenance_dorms: i64,
    pub total_capacity: i64,
    #[sqlx(skip)]
    pub occupancy_rate: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthlyEarnings {
    pub paid: f64,
    pub pending: f64,
    pub collection_rate: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct RecentTransaction {
    pub transaction_id: i64,
    pub transaction_date: NaiveDate,
    pub tenant_name: String,
    pub amount: f64,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TenantDashboard {
    pub active_reservations: i64,
    /// Balance and due date of the earliest DUE or OVERDUE payment.
    pub next_payment: Option<(f64, NaiveDate)>,
}

/// Percentage of capacity occupied, rounded; 0 when there is no capacity.
pub fn occupancy_rate(occupants: i64, capacity: i64) -> i64 {
    if capacity <= 0 {
        return 0;
    }
    (occupants as f64 / capacity as f64 * 100.0).round() as i64
}

/// Share of the month's billing already collected, truncated to a whole percent.
pub fn collection_rate(paid: f64, pending: f64) -> i64 {
    let total = paid + pending;
    if total <= 0.0 {
        return 0;
    }
    (paid / total * 100.0).trunc() as i64
}

fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

pub async fn owner_stats(db: &StaySmartDb, owner_id: i64, today: NaiveDate) -> Result<OwnerStats> {
    let sql = format!(
        r#"
        SELECT
            (SELECT COUNT(*) FROM dorms WHERE owner_id = ?1) AS total_dorms,
            (SELECT COUNT(*)
               FROM rentals rr
               JOIN rooms r ON rr.room_id = r.room_id
               JOIN dorms d ON r.dorm_id = d.dorm_id
              WHERE d.owner_id = ?1
                AND rr.status IN {occupying}) AS current_occupants,
            (SELECT COUNT(*)
               FROM rental_applications ra
               JOIN dorms d ON ra.dorm_id = d.dorm_id
              WHERE d.owner_id = ?1 AND ra.action_status = 'WAITING') AS pending_requests,
            (SELECT TOTAL(amount)
               FROM transactions
              WHERE owner_id = ?1 AND status = 'PAID'
                AND strftime('%Y-%m', transaction_date) = ?2) AS monthly_earnings,
            (SELECT COUNT(*) FROM dorms
              WHERE owner_id = ?1 AND status = 'OPEN') AS active_dorms,
            (SELECT COUNT(*) FROM dorms
              WHERE owner_id = ?1 AND status = 'UNDER_MAINTENANCE') AS maintenance_dorms,
            (SELECT COALESCE(SUM(r.capacity), 0)
               FROM rooms r
               JOIN dorms d ON r.dorm_id = d.dorm_id
              WHERE d.owner_id = ?1) AS total_capacity
        "#,
        occupying = RentalStatus::occupying_sql()
    );
    let row: Option<OwnerStats> = db
        .fetch_one(
            sqlx::query_as(&sql)
                .bind(owner_id)
                .bind(month_key(today.year(), today.month())),
        )
        .await?;

    let mut stats = row.unwrap_or_default();
    stats.occupancy_rate = occupancy_rate(stats.current_occupants, stats.total_capacity);
    Ok(stats)
}

/// Paid versus still-owed rent for one calendar month.
pub async fn monthly_earnings_summary(
    db: &StaySmartDb,
    owner_id: i64,
    year: i32,
    month: u32,
) -> Result<MonthlyEarnings> {
    let key = month_key(year, month);
    let row: Option<(f64, f64)> = db
        .fetch_one(
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT TOTAL(amount)
                       FROM transactions
                      WHERE owner_id = ?1 AND status = 'PAID'
                        AND strftime('%Y-%m', transaction_date) = ?2),
                    (SELECT TOTAL(p.amount_due - p.amount_paid)
                       FROM payments p
                       JOIN rentals rr ON p.rental_id = rr.rental_id
                       JOIN rooms r ON rr.room_id = r.room_id
                       JOIN dorms d ON r.dorm_id = d.dorm_id
                      WHERE d.owner_id = ?1
                        AND p.status IN ('PENDING', 'DUE', 'OVERDUE')
                        AND strftime('%Y-%m', p.due_date) = ?2)
                "#,
            )
            .bind(owner_id)
            .bind(&key),
        )
        .await?;

    let (paid, pending) = row.unwrap_or_default();
    Ok(MonthlyEarnings {
        paid,
        pending,
        collection_rate: collection_rate(paid, pending),
    })
}

/// PAID ledger totals per month of `year`; index 0 is January.
pub async fn monthly_revenue_series(
    db: &StaySmartDb,
    owner_id: i64,
    year: i32,
) -> Result<[f64; 12]> {
    let rows: Vec<(i64, f64)> = db
        .fetch_all(
            sqlx::query_as(
                r#"
                SELECT CAST(strftime('%m', transaction_date) AS INTEGER) AS m,
                       TOTAL(amount)
                FROM transactions
                WHERE owner_id = ? AND status = 'PAID'
                  AND strftime('%Y', transaction_date) = ?
                GROUP BY m
                "#,
            )
            .bind(owner_id)
            .bind(format!("{year:04}")),
        )
        .await?;

    let mut series = [0.0; 12];
    for (month, total) in rows {
        if let Some(slot) = usize::try_from(month - 1).ok().and_then(|i| series.get_mut(i)) {
            *slot = total;
        }
    }
    Ok(series)
}

/// The host's latest ledger entries in `year`, newest first.
pub async fn recent_transactions(
    db: &StaySmartDb,
    owner_id: i64,
    year: i32,
    limit: i64,
) -> Result<Vec<RecentTransaction>> {
    db.fetch_all(
        sqlx::query_as(
            r#"
            SELECT t.transaction_id,
                   t.transaction_date,
                   u.fullname AS tenant_name,
                   t.amount,
                   t.status
            FROM transactions t
            JOIN users u ON t.tenant_id = u.user_id
            WHERE t.owner_id = ?
              AND strftime('%Y', t.transaction_date) = ?
            ORDER BY t.transaction_date DESC, t.transaction_id DESC
            LIMIT ?
            "#,
        )
        .bind(owner_id)
        .bind(format!("{year:04}"))
        .bind(limit),
    )
    .await
}

/// Years with at least one ledger entry, newest first.
pub async fn transaction_years(db: &StaySmartDb, owner_id: i64) -> Result<Vec<i32>> {
    let rows: Vec<(i32,)> = db
        .fetch_all(
            sqlx::query_as(
                r#"
                SELECT DISTINCT CAST(strftime('%Y', transaction_date) AS INTEGER) AS y
                FROM transactions
                WHERE owner_id = ?
                ORDER BY y DESC
                "#,
            )
            .bind(owner_id),
        )
        .await?;
    Ok(rows.into_iter().map(|(y,)| y).collect())
}

/// Occupying rentals that started in the seven days ending `today`,
/// bucketed Monday through Sunday.
pub async fn occupancy_weekly(
    db: &StaySmartDb,
    owner_id: i64,
    today: NaiveDate,
) -> Result<[i64; 7]> {
    let window_start = add_days(today, -6)?;
    let from = occupying_rentals();
    // strftime('%w') counts from Sunday = 0; shift so Monday lands in slot 0.
    let sql = format!(
        "SELECT (CAST(strftime('%w', rr.start_date) AS INTEGER) + 6) % 7 AS dow, COUNT(*) \
         {from} AND rr.start_date BETWEEN ? AND ? GROUP BY dow"
    );
    let rows: Vec<(i64, i64)> = db
        .fetch_all(
            sqlx::query_as(&sql)
                .bind(owner_id)
                .bind(window_start)
                .bind(today),
        )
        .await?;

    let mut week = [0; 7];
    for (day, count) in rows {
        if let Some(slot) = usize::try_from(day).ok().and_then(|i| week.get_mut(i)) {
            *slot = count;
        }
    }
    Ok(week)
}

/// Occupying rentals per start month of `year`; index 0 is January.
pub async fn occupancy_monthly(db: &StaySmartDb, owner_id: i64, year: i32) -> Result<[i64; 12]> {
    let from = occupying_rentals();
    let sql = format!(
        "SELECT CAST(strftime('%m', rr.start_date) AS INTEGER) AS m, COUNT(*) \
         {from} AND strftime('%Y', rr.start_date) = ? GROUP BY m"
    );
    let rows: Vec<(i64, i64)> = db
        .fetch_all(sqlx::query_as(&sql).bind(owner_id).bind(format!("{year:04}")))
        .await?;

    let mut months = [0; 12];
    for (month, count) in rows {
        if let Some(slot) = usize::try_from(month - 1).ok().and_then(|i| months.get_mut(i)) {
            *slot = count;
        }
    }
    Ok(months)
}

/// Occupying rentals per start year for the latest `years_back` years that
/// have any, oldest first, as chart labels and values.
pub async fn occupancy_yearly(
    db: &StaySmartDb,
    owner_id: i64,
    years_back: i64,
) -> Result<(Vec<String>, Vec<i64>)> {
    let from = occupying_rentals();
    let sql = format!(
        "SELECT CAST(strftime('%Y', rr.start_date) AS INTEGER) AS y, COUNT(*) \
         {from} GROUP BY y ORDER BY y DESC LIMIT ?"
    );
    let rows: Vec<(i64, i64)> = db
        .fetch_all(sqlx::query_as(&sql).bind(owner_id).bind(years_back))
        .await?;

    Ok(rows
        .into_iter()
        .rev()
        .map(|(year, count)| (year.to_string(), count))
        .unzip())
}

pub async fn tenant_dashboard_stats(db: &StaySmartDb, tenant_id: i64) -> Result<TenantDashboard> {
    let active_sql = format!(
        "SELECT COUNT(*) FROM rentals WHERE tenant_id = ? AND status IN {}",
        RentalStatus::occupying_sql()
    );
    let active: Option<(i64,)> = db
        .fetch_one(sqlx::query_as(&active_sql).bind(tenant_id))
        .await?;

    let next_payment: Option<(f64, NaiveDate)> = db
        .fetch_one(
            sqlx::query_as(
                r#"
                SELECT p.amount_due - p.amount_paid, p.due_date
                FROM payments p
                JOIN rentals rr ON p.rental_id = rr.rental_id
                WHERE rr.tenant_id = ?
                  AND p.status IN ('DUE', 'OVERDUE')
                ORDER BY p.due_date ASC, p.payment_id ASC
                LIMIT 1
                "#,
            )
            .bind(tenant_id),
        )
        .await?;

    Ok(TenantDashboard {
        active_reservations: active.map(|(n,)| n).unwrap_or(0),
        next_payment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::persistence::test_support::{date, dorm, test_db, user};
    use crate::persistence::transactions::{record_transaction, NewTransaction};
    use crate::persistence::{payments, rentals};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_occupancy_rate_rounds() {
        assert_eq!(occupancy_rate(6, 12), 50);
        assert_eq!(occupancy_rate(1, 3), 33);
        assert_eq!(occupancy_rate(2, 3), 67);
        assert_eq!(occupancy_rate(5, 0), 0);
        assert_eq!(occupancy_rate(0, 0), 0);
    }

    #[test]
    fn test_collection_rate_truncates() {
        assert_eq!(collection_rate(2.0, 1.0), 66);
        assert_eq!(collection_rate(0.0, 0.0), 0);
        assert_eq!(collection_rate(500.0, 0.0), 100);
    }

    #[tokio::test]
    async fn test_empty_owner_is_all_zero() {
        let db = test_db().await;
        let owner = user(&db, Role::Owner, "host").await;

        let stats = owner_stats(&db, owner, date(2025, 5, 1)).await.unwrap();
        assert_eq!(stats, OwnerStats::default());

        let earnings = monthly_earnings_summary(&db, owner, 2025, 5).await.unwrap();
        assert_eq!(earnings, MonthlyEarnings::default());

        assert_eq!(monthly_revenue_series(&db, owner, 2025).await.unwrap(), [0.0; 12]);
        assert_eq!(occupancy_weekly(&db, owner, date(2025, 5, 1)).await.unwrap(), [0; 7]);
        assert_eq!(occupancy_monthly(&db, owner, 2025).await.unwrap(), [0; 12]);
        assert_eq!(
            occupancy_yearly(&db, owner, 4).await.unwrap(),
            (Vec::<String>::new(), Vec::<i64>::new())
        );
        assert!(transaction_years(&db, owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revenue_and_earnings() {
        let db = test_db().await;
        let owner = user(&db, Role::Owner, "host").await;
        let tenant = user(&db, Role::Tenant, "tenant").await;
        let (_, rooms) = dorm(&db, owner, "Casa", &[(1, 3000.0)]).await;
        let rental = rentals::create_rental(&db, tenant, rooms[0], date(2024, 12, 1))
            .await
            .unwrap();

        for (amount, day) in [
            (3000.0, date(2025, 1, 5)),
            (3000.0, date(2025, 2, 5)),
            (1500.0, date(2025, 2, 20)),
            (2800.0, date(2024, 12, 5)),
        ] {
            record_transaction(&db, &NewTransaction::paid(owner, tenant, Some(rental), amount, day))
                .await
                .unwrap();
        }
        payments::create_monthly_payment(&db, rental, date(2025, 2, 28), 3000.0)
            .await
            .unwrap();

        let series = monthly_revenue_series(&db, owner, 2025).await.unwrap();
        assert_eq!(series[0], 3000.0);
        assert_eq!(series[1], 4500.0);
        assert_eq!(series[2], 0.0);

        let feb = monthly_earnings_summary(&db, owner, 2025, 2).await.unwrap();
        assert_eq!(feb.paid, 4500.0);
        assert_eq!(feb.pending, 3000.0);
        assert_eq!(feb.collection_rate, 60);

        assert_eq!(transaction_years(&db, owner).await.unwrap(), vec![2025, 2024]);

        let recent = recent_transactions(&db, owner, 2025, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].transaction_date, date(2025, 2, 20));
        assert_eq!(recent[0].tenant_name, "tenant fullname");

        let stats = owner_stats(&db, owner, date(2025, 2, 21)).await.unwrap();
        assert_eq!(stats.monthly_earnings, 4500.0);
        assert_eq!(stats.current_occupants, 1);
        assert_eq!(stats.occupancy_rate, 100);
    }

    #[tokio::test]
    async fn test_occupancy_charts() {
        let db = test_db().await;
        let owner = user(&db, Role::Owner, "host").await;
        let tenant = user(&db, Role::Tenant, "tenant").await;
        let (_, rooms) = dorm(&db, owner, "Casa", &[(1, 1.0), (1, 1.0), (1, 1.0), (1, 1.0)]).await;

        // 2025-06-02 is a Monday and 2025-06-08 a Sunday.
        rentals::create_rental(&db, tenant, rooms[0], date(2025, 6, 2)).await.unwrap();
        rentals::create_rental(&db, tenant, rooms[1], date(2025, 6, 8)).await.unwrap();
        rentals::create_rental(&db, tenant, rooms[2], date(2023, 3, 1)).await.unwrap();
        let ended = rentals::create_rental(&db, tenant, rooms[3], date(2025, 6, 3))
            .await
            .unwrap();
        rentals::end_rental(&db, ended, date(2025, 6, 5)).await.unwrap();

        let week = occupancy_weekly(&db, owner, date(2025, 6, 8)).await.unwrap();
        assert_eq!(week, [1, 0, 0, 0, 0, 0, 1]);

        let months = occupancy_monthly(&db, owner, 2025).await.unwrap();
        assert_eq!(months[5], 2);
        assert_eq!(months.iter().sum::<i64>(), 2);

        let (labels, values) = occupancy_yearly(&db, owner, 4).await.unwrap();
        assert_eq!(labels, vec!["2023".to_string(), "2025".to_string()]);
        assert_eq!(values, vec![1, 2]);

        let (labels, _) = occupancy_yearly(&db, owner, 1).await.unwrap();
        assert_eq!(labels, vec!["2025".to_string()]);
    }

    #[tokio::test]
    async fn test_tenant_dashboard() {
        let db = test_db().await;
        let owner = user(&db, Role::Owner, "host").await;
        let tenant = user(&db, Role::Tenant, "tenant").await;
        let (_, rooms) = dorm(&db, owner, "Casa", &[(1, 2500.0)]).await;
        let rental = rentals::create_rental(&db, tenant, rooms[0], date(2025, 1, 1))
            .await
            .unwrap();

        let empty = tenant_dashboard_stats(&db, tenant).await.unwrap();
        assert_eq!(empty.active_reservations, 1);
        assert_eq!(empty.next_payment, None);

        payments::create_monthly_payment(&db, rental, date(2025, 1, 31), 2500.0)
            .await
            .unwrap();
        payments::create_monthly_payment(&db, rental, date(2025, 3, 2), 2500.0)
            .await
            .unwrap();
        // Only cycles already due count as the next payment.
        assert_eq!(tenant_dashboard_stats(&db, tenant).await.unwrap().next_payment, None);

        payments::mark_due_payments(&db, date(2025, 1, 30), 3).await.unwrap();
        let dash = tenant_dashboard_stats(&db, tenant).await.unwrap();
        assert_eq!(dash.next_payment, Some((2500.0, date(2025, 1, 31))));
    }
}
