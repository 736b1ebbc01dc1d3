//! Accounts and the per-role profile tables.

use super::StaySmartDb;
use crate::error::Result;
use crate::models::{OwnerProfile, Role, TenantProfile, User};
use serde::Serialize;
use sqlx::FromRow;
use tracing::debug;

const USER_COLUMNS: &str = "user_id, role, fullname, username, email, contact_no, \
                            password_hash, is_active, created_at";

/// Data needed to insert an account. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub role: Role,
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub contact_no: Option<String>,
    pub password_hash: String,
}

/// Tenant profile joined with the account's contact columns.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TenantProfileView {
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub guardian_fullname: Option<String>,
    pub guardian_contact: Option<String>,
    pub guardian_email: Option<String>,
    pub profile_picture_url: Option<String>,
    pub agreed_terms: bool,
    pub email: String,
    pub contact_no: Option<String>,
}

/// Inserts an account and returns its id.
pub async fn create_user(db: &StaySmartDb, user: &NewUser) -> Result<i64> {
    let id = db
        .execute(
            sqlx::query(
                "INSERT INTO users (role, fullname, username, email, contact_no, password_hash) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(user.role)
            .bind(&user.fullname)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.contact_no)
            .bind(&user.password_hash),
        )
        .await?;
    debug!(user_id = id, role = %user.role, "created user");
    Ok(id)
}

/// Looks up an active account by username. Deactivated accounts are invisible.
pub async fn get_user_by_username(db: &StaySmartDb, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? AND is_active = 1");
    db.fetch_one(sqlx::query_as(&sql).bind(username)).await
}

pub async fn get_user(db: &StaySmartDb, user_id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?");
    db.fetch_one(sqlx::query_as(&sql).bind(user_id)).await
}

/// Returns true if any account, active or not, already uses `username`.
pub async fn username_exists(db: &StaySmartDb, username: &str) -> Result<bool> {
    let row: Option<(i64,)> = db
        .fetch_one(sqlx::query_as("SELECT 1 FROM users WHERE username = ? LIMIT 1").bind(username))
        .await?;
    Ok(row.is_some())
}

/// Returns true if any account already uses `email`.
pub async fn email_exists(db: &StaySmartDb, email: &str) -> Result<bool> {
    let row: Option<(i64,)> = db
        .fetch_one(sqlx::query_as("SELECT 1 FROM users WHERE email = ? LIMIT 1").bind(email))
        .await?;
    Ok(row.is_some())
}

/// Role of the account registered under `email`, if any.
pub async fn email_role(db: &StaySmartDb, email: &str) -> Result<Option<Role>> {
    let row: Option<(Role,)> = db
        .fetch_one(sqlx::query_as("SELECT role FROM users WHERE email = ? LIMIT 1").bind(email))
        .await?;
    Ok(row.map(|(role,)| role))
}

/// Flips the account's active flag. Inactive accounts cannot log in.
pub async fn set_user_active(db: &StaySmartDb, user_id: i64, active: bool) -> Result<bool> {
    let changed = db
        .execute_count(
            sqlx::query("UPDATE users SET is_active = ? WHERE user_id = ?")
                .bind(active)
                .bind(user_id),
        )
        .await?;
    Ok(changed > 0)
}

pub async fn create_owner_profile(db: &StaySmartDb, profile: &OwnerProfile) -> Result<()> {
    db.execute(
        sqlx::query(
            "INSERT INTO owner_profiles (owner_id, display_name, messenger_link, facebook_link) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(profile.owner_id)
        .bind(&profile.display_name)
        .bind(&profile.messenger_link)
        .bind(&profile.facebook_link),
    )
    .await?;
    debug!(owner_id = profile.owner_id, "created owner profile");
    Ok(())
}

pub async fn get_owner_profile(db: &StaySmartDb, owner_id: i64) -> Result<Option<OwnerProfile>> {
    db.fetch_one(
        sqlx::query_as(
            "SELECT owner_id, display_name, messenger_link, facebook_link \
             FROM owner_profiles WHERE owner_id = ?",
        )
        .bind(owner_id),
    )
    .await
}

/// Inserts the tenant profile or replaces every field of the existing one.
pub async fn save_tenant_profile(db: &StaySmartDb, profile: &TenantProfile) -> Result<()> {
    db.execute(
        sqlx::query(
            r#"
            INSERT INTO tenant_profiles (
                tenant_id, first_name, last_name, gender,
                guardian_fullname, guardian_contact, guardian_email,
                profile_picture_url, agreed_terms
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (tenant_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                gender = excluded.gender,
                guardian_fullname = excluded.guardian_fullname,
                guardian_contact = excluded.guardian_contact,
                guardian_email = excluded.guardian_email,
                profile_picture_url = excluded.profile_picture_url,
                agreed_terms = excluded.agreed_terms
            "#,
        )
        .bind(profile.tenant_id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.gender)
        .bind(&profile.guardian_fullname)
        .bind(&profile.guardian_contact)
        .bind(&profile.guardian_email)
        .bind(&profile.profile_picture_url)
        .bind(profile.agreed_terms),
    )
    .await?;
    debug!(tenant_id = profile.tenant_id, "saved tenant profile");
    Ok(())
}

pub async fn get_tenant_profile(
    db: &StaySmartDb,
    tenant_id: i64,
) -> Result<Option<TenantProfileView>> {
    db.fetch_one(
        sqlx::query_as(
            r#"
            SELECT tp.first_name, tp.last_name, tp.gender,
                   tp.guardian_fullname, tp.guardian_contact, tp.guardian_email,
                   tp.profile_picture_url, tp.agreed_terms,
                   u.email, u.contact_no
            FROM tenant_profiles tp
            JOIN users u ON tp.tenant_id = u.user_id
            WHERE tp.tenant_id = ?
            "#,
        )
        .bind(tenant_id),
    )
    .await
}
