//! Host dashboard figures over a small portfolio.

use super::support::{account, create_test_db, date, listed_dorm};
use pretty_assertions::assert_eq;
use staysmart::models::{Role, TransactionStatus};
use staysmart::persistence::{payments, rentals, stats, transactions, NewTransaction};
use staysmart::StaySmartDb;

/// Four dorms with one triple room each, six current occupants and one
/// tenant who already moved out.
async fn portfolio(db: &StaySmartDb) -> (i64, Vec<i64>, Vec<i64>) {
    let owner = account(db, Role::Owner, "host").await;
    let mut rooms = Vec::new();
    for name in ["Alpha", "Bravo", "Charlie", "Delta"] {
        let (_, ids) = listed_dorm(db, owner, name, &[(3, 3000.0)]).await;
        rooms.push(ids[0]);
    }

    let starts = [
        (rooms[0], date(2023, 11, 11)),
        (rooms[0], date(2024, 3, 1)),
        (rooms[1], date(2025, 1, 20)),
        (rooms[1], date(2025, 6, 8)),
        (rooms[2], date(2025, 6, 9)),
        (rooms[3], date(2025, 6, 15)),
    ];
    let mut rental_ids = Vec::new();
    for (i, (room, start)) in starts.into_iter().enumerate() {
        let tenant = account(db, Role::Tenant, &format!("tenant{i}")).await;
        rental_ids.push(rentals::create_rental(db, tenant, room, start).await.unwrap());
    }

    let gone = account(db, Role::Tenant, "gone").await;
    let ended = rentals::create_rental(db, gone, rooms[2], date(2025, 6, 10))
        .await
        .unwrap();
    rentals::end_rental(db, ended, date(2025, 6, 12)).await.unwrap();

    (owner, rooms, rental_ids)
}

#[tokio::test]
async fn test_owner_stats_occupancy_rate() {
    let (db, _dir) = create_test_db().await;
    let (owner, _, _) = portfolio(&db).await;

    let stats = stats::owner_stats(&db, owner, date(2025, 6, 15)).await.unwrap();
    assert_eq!(stats.total_dorms, 4);
    assert_eq!(stats.active_dorms, 4);
    assert_eq!(stats.current_occupants, 6);
    assert_eq!(stats.total_capacity, 12);
    assert_eq!(stats.occupancy_rate, 50);
}

#[tokio::test]
async fn test_owner_without_rooms_reads_zero() {
    let (db, _dir) = create_test_db().await;
    let owner = account(&db, Role::Owner, "newcomer").await;

    let stats = stats::owner_stats(&db, owner, date(2025, 6, 15)).await.unwrap();
    assert_eq!(stats.total_capacity, 0);
    assert_eq!(stats.occupancy_rate, 0);
    assert_eq!(stats.monthly_earnings, 0.0);

    let summary = stats::monthly_earnings_summary(&db, owner, 2025, 6).await.unwrap();
    assert_eq!(summary.collection_rate, 0);
    assert!(stats::transaction_years(&db, owner).await.unwrap().is_empty());
    assert_eq!(
        stats::occupancy_yearly(&db, owner, 4).await.unwrap(),
        (Vec::<String>::new(), Vec::<i64>::new())
    );
}

#[tokio::test]
async fn test_occupancy_series() {
    let (db, _dir) = create_test_db().await;
    let (owner, _, _) = portfolio(&db).await;

    // 2025-06-15 is a Sunday; the window opens on Monday the 9th.
    let weekly = stats::occupancy_weekly(&db, owner, date(2025, 6, 15)).await.unwrap();
    assert_eq!(weekly, [1, 0, 0, 0, 0, 0, 1]);

    let monthly = stats::occupancy_monthly(&db, owner, 2025).await.unwrap();
    assert_eq!(monthly, [1, 0, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0]);

    let (labels, values) = stats::occupancy_yearly(&db, owner, 2).await.unwrap();
    assert_eq!(labels, vec!["2024".to_string(), "2025".to_string()]);
    assert_eq!(values, vec![1, 4]);

    let (labels, values) = stats::occupancy_yearly(&db, owner, 4).await.unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(values, vec![1, 1, 4]);
}

#[tokio::test]
async fn test_earnings_and_ledger() {
    let (db, _dir) = create_test_db().await;
    let (owner, _, rental_ids) = portfolio(&db).await;
    let rental = rentals::get_rental(&db, rental_ids[0]).await.unwrap().unwrap();

    for (amount, day) in [
        (1000.0, date(2025, 6, 3)),
        (2500.0, date(2025, 2, 1)),
        (800.0, date(2024, 12, 30)),
    ] {
        transactions::record_transaction(
            &db,
            &NewTransaction::paid(owner, rental.tenant_id, Some(rental.rental_id), amount, day),
        )
        .await
        .unwrap();
    }
    // Unsettled ledger entries never count as earnings.
    transactions::record_transaction(
        &db,
        &NewTransaction {
            status: TransactionStatus::Pending,
            ..NewTransaction::paid(owner, rental.tenant_id, None, 9999.0, date(2025, 6, 4))
        },
    )
    .await
    .unwrap();
    payments::create_monthly_payment(&db, rental.rental_id, date(2025, 6, 20), 3000.0)
        .await
        .unwrap();

    let june = stats::monthly_earnings_summary(&db, owner, 2025, 6).await.unwrap();
    assert_eq!(june.paid, 1000.0);
    assert_eq!(june.pending, 3000.0);
    assert_eq!(june.collection_rate, 25);

    let headline = stats::owner_stats(&db, owner, date(2025, 6, 15)).await.unwrap();
    assert_eq!(headline.monthly_earnings, 1000.0);

    let series = stats::monthly_revenue_series(&db, owner, 2025).await.unwrap();
    assert_eq!(series[0], 0.0);
    assert_eq!(series[1], 2500.0);
    assert_eq!(series[5], 1000.0);
    assert_eq!(series.iter().sum::<f64>(), 3500.0);

    assert_eq!(
        stats::transaction_years(&db, owner).await.unwrap(),
        vec![2025, 2024]
    );

    let recent = stats::recent_transactions(&db, owner, 2025, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].transaction_date, date(2025, 6, 4));
    assert_eq!(recent[0].status, TransactionStatus::Pending);
    assert_eq!(recent[1].amount, 1000.0);
    assert_eq!(recent[1].tenant_name, "tenant0 test");
}
