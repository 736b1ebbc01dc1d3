//! Signup and login against a file-backed store.

use super::support::{count_rows, create_test_db, signup_request};
use pretty_assertions::assert_eq;
use staysmart::auth::{self, LoginOutcome, EMAIL_TAKEN, LOGIN_FAILED, USERNAME_TAKEN};
use staysmart::models::Role;
use staysmart::persistence::users;

#[tokio::test]
async fn test_signup_then_login_succeeds() {
    let (db, _dir) = create_test_db().await;

    let outcome = auth::tenant_signup(&db, &signup_request("mika")).await.unwrap();
    assert!(outcome.success);

    let login = auth::login(&db, "mika", "mika-password").await.unwrap();
    assert_eq!(
        login,
        LoginOutcome::Success {
            user_id: outcome.user_id.unwrap(),
            role: Role::Tenant,
        }
    );

    let stored = users::get_user_by_username(&db, "mika").await.unwrap().unwrap();
    assert!(stored.password_hash.starts_with("$argon2"));
    assert_ne!(stored.password_hash, "mika-password");
}

#[tokio::test]
async fn test_reused_username_or_email_inserts_nothing() {
    let (db, _dir) = create_test_db().await;
    auth::owner_signup(&db, &signup_request("host")).await.unwrap();
    assert_eq!(count_rows(&db, "users").await, 1);

    let mut same_username = signup_request("host");
    same_username.email = "different@staysmart.test".to_string();
    let outcome = auth::tenant_signup(&db, &same_username).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, USERNAME_TAKEN);
    assert_eq!(outcome.user_id, None);

    let mut same_email = signup_request("other");
    same_email.email = "host@staysmart.test".to_string();
    let outcome = auth::tenant_signup(&db, &same_email).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, EMAIL_TAKEN);

    assert_eq!(count_rows(&db, "users").await, 1);
}

#[tokio::test]
async fn test_wrong_password_discloses_nothing() {
    let (db, _dir) = create_test_db().await;
    auth::tenant_signup(&db, &signup_request("mika")).await.unwrap();

    let outcome = auth::login(&db, "mika", "guess").await.unwrap();
    assert_eq!(
        outcome,
        LoginOutcome::Failed {
            message: LOGIN_FAILED.to_string()
        }
    );
    assert_eq!(outcome, auth::login(&db, "ghost", "guess").await.unwrap());
}

#[tokio::test]
async fn test_role_gated_login() {
    let (db, _dir) = create_test_db().await;
    auth::owner_signup(&db, &signup_request("host")).await.unwrap();

    assert!(!auth::login_as(&db, Role::Tenant, "host", "host-password")
        .await
        .unwrap()
        .is_success());
    assert!(auth::login_as(&db, Role::Owner, "host", "host-password")
        .await
        .unwrap()
        .is_success());
    assert_eq!(
        auth::email_role(&db, "host@staysmart.test").await.unwrap(),
        Some(Role::Owner)
    );
}
