//! A tenant's stay from application to move-out.

use super::support::{account, count_rows, create_test_db, date, listed_dorm};
use pretty_assertions::assert_eq;
use staysmart::error::StaySmartError;
use staysmart::models::{
    ApplicationStatus, PaymentRequestStatus, PaymentStatus, RentalStatus, Role,
};
use staysmart::persistence::{
    applications, payment_requests, payments, rentals, rooms, stats, NewApplication, RoomSearch,
};

#[tokio::test]
async fn test_full_rental_lifecycle() {
    let (db, _dir) = create_test_db().await;
    let owner = account(&db, Role::Owner, "host").await;
    let tenant = account(&db, Role::Tenant, "mika").await;
    let (dorm_id, room_ids) =
        listed_dorm(&db, owner, "Casa Verde", &[(1, 4000.0), (2, 3000.0)]).await;

    // Tenant finds the room and applies.
    let found = rooms::search_rooms(
        &db,
        &RoomSearch {
            text: "verde".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 2);

    let app_id = applications::create_rental_application(
        &db,
        &NewApplication {
            tenant_id: tenant,
            dorm_id,
            room_id: room_ids[0],
            tenant_fullname: Some("Mika Santos".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(applications::user_has_active_reservation(&db, tenant).await.unwrap());
    let before = stats::owner_stats(&db, owner, date(2025, 1, 5)).await.unwrap();
    assert_eq!(before.pending_requests, 1);

    // Host approves.
    let rental_id = applications::approve_application(&db, app_id, date(2025, 1, 10))
        .await
        .unwrap();
    assert_eq!(
        applications::get_application(&db, app_id).await.unwrap().unwrap().action_status,
        ApplicationStatus::Approved
    );
    let occupied = rooms::get_occupied_rooms_host(&db, owner).await.unwrap();
    assert_eq!(occupied.len(), 1);
    assert_eq!(occupied[0].tenant_name, "Mika Santos");
    assert_eq!(rooms::get_available_rooms_host(&db, owner).await.unwrap().len(), 1);

    // Billing makes the first cycle due.
    assert_eq!(payments::mark_due_payments(&db, date(2025, 2, 7), 3).await.unwrap(), 1);
    let dash = stats::tenant_dashboard_stats(&db, tenant).await.unwrap();
    assert_eq!(dash.active_reservations, 1);
    assert_eq!(dash.next_payment, Some((4000.0, date(2025, 2, 9))));

    // Tenant pays, host approves the proof.
    let request = payment_requests::submit_payment_request(
        &db,
        tenant,
        rental_id,
        4000.0,
        Some("proofs/feb.png"),
    )
    .await
    .unwrap();
    payment_requests::review_payment_request(&db, request, true, None, date(2025, 2, 8))
        .await
        .unwrap();
    assert_eq!(
        payment_requests::get_payment_request(&db, request)
            .await
            .unwrap()
            .unwrap()
            .status,
        PaymentRequestStatus::Approved
    );

    let history = payments::get_user_payments(&db, tenant).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, PaymentStatus::Paid);
    assert_eq!(history[1].due_date, date(2025, 3, 11));

    let feb = stats::monthly_earnings_summary(&db, owner, 2025, 2).await.unwrap();
    assert_eq!(feb.paid, 4000.0);
    assert_eq!(feb.pending, 0.0);
    assert_eq!(feb.collection_rate, 100);

    // Move-out frees the room, twice over without harm.
    rentals::end_rental(&db, rental_id, date(2025, 3, 1)).await.unwrap();
    rentals::end_rental(&db, rental_id, date(2025, 3, 2)).await.unwrap();
    let rental = rentals::get_rental(&db, rental_id).await.unwrap().unwrap();
    assert_eq!(rental.status, RentalStatus::Ended);
    assert_eq!(rental.end_date, Some(date(2025, 3, 1)));
    assert!(rooms::get_room(&db, room_ids[0]).await.unwrap().unwrap().is_available);
    assert!(!applications::user_has_active_reservation(&db, tenant).await.unwrap());
}

#[tokio::test]
async fn test_double_approval_creates_nothing_twice() {
    let (db, _dir) = create_test_db().await;
    let owner = account(&db, Role::Owner, "host").await;
    let tenant = account(&db, Role::Tenant, "mika").await;
    let (dorm_id, room_ids) = listed_dorm(&db, owner, "Casa", &[(1, 2500.0)]).await;

    let app_id = applications::create_rental_application(
        &db,
        &NewApplication {
            tenant_id: tenant,
            dorm_id,
            room_id: room_ids[0],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    applications::approve_application(&db, app_id, date(2025, 4, 1))
        .await
        .unwrap();
    let err = applications::approve_application(&db, app_id, date(2025, 4, 2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StaySmartError::InvalidTransition { entity: "application", .. }
    ));

    assert_eq!(count_rows(&db, "rentals").await, 1);
    assert_eq!(count_rows(&db, "payments").await, 1);
}

#[tokio::test]
async fn test_concurrent_approvals_settle_on_one_rental() {
    let (db, _dir) = create_test_db().await;
    let owner = account(&db, Role::Owner, "host").await;
    let tenant = account(&db, Role::Tenant, "mika").await;
    let (dorm_id, room_ids) = listed_dorm(&db, owner, "Casa", &[(1, 2500.0)]).await;

    let app_id = applications::create_rental_application(
        &db,
        &NewApplication {
            tenant_id: tenant,
            dorm_id,
            room_id: room_ids[0],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let (a, b) = tokio::join!(
        applications::approve_application(&db, app_id, date(2025, 4, 1)),
        applications::approve_application(&db, app_id, date(2025, 4, 1)),
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(count_rows(&db, "rentals").await, 1);
    assert_eq!(count_rows(&db, "payments").await, 1);
}

#[tokio::test]
async fn test_overdue_payment_settled_in_full() {
    let (db, _dir) = create_test_db().await;
    let owner = account(&db, Role::Owner, "host").await;
    let tenant = account(&db, Role::Tenant, "mika").await;
    let (_, room_ids) = listed_dorm(&db, owner, "Casa", &[(1, 3000.0)]).await;

    let rental_id = rentals::create_rental(&db, tenant, room_ids[0], date(2025, 1, 1))
        .await
        .unwrap();
    let payment = payments::create_monthly_payment(&db, rental_id, date(2025, 1, 31), 3000.0)
        .await
        .unwrap();

    assert_eq!(payments::mark_overdue_payments(&db, date(2025, 2, 5)).await.unwrap(), 1);
    let due = rentals::get_tenant_due(&db, tenant).await.unwrap().unwrap();
    assert_eq!(due.status, PaymentStatus::Overdue);

    let jan = stats::monthly_earnings_summary(&db, owner, 2025, 1).await.unwrap();
    assert_eq!(jan.pending, 3000.0);
    assert_eq!(jan.collection_rate, 0);

    payments::mark_payment_paid(&db, payment, None).await.unwrap();
    let paid = payments::get_payment(&db, payment).await.unwrap().unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert_eq!(paid.amount_paid, paid.amount_due);
    assert!(rentals::get_tenant_due(&db, tenant).await.unwrap().is_none());
}
