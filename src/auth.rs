//! Signup, login and role checks.
//!
//! Passwords are stored as Argon2id PHC strings with a random salt per
//! account. Login failures share one message so callers cannot tell an
//! unknown username from a wrong password or a deactivated account.

use crate::error::{Result, StaySmartError};
use crate::models::Role;
use crate::persistence::users::{self, NewUser};
use crate::persistence::StaySmartDb;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const LOGIN_FAILED: &str = "Invalid username or password";
pub const USERNAME_TAKEN: &str = "Username already exists";
pub const EMAIL_TAKEN: &str = "Email already registered";

/// Form data submitted by someone creating an account.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub fullname: String,
    pub username: String,
    pub contact_no: Option<String>,
    pub email: String,
    pub password: String,
}

/// Result of a signup attempt. Duplicates are reported here, not as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupOutcome {
    pub success: bool,
    pub message: String,
    pub user_id: Option<i64>,
}

impl SignupOutcome {
    fn rejected(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoginOutcome {
    Success { user_id: i64, role: Role },
    Failed { message: String },
}

impl LoginOutcome {
    fn failed() -> Self {
        Self::Failed {
            message: LOGIN_FAILED.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Hashes `password` into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StaySmartError::auth(format!("Failed to hash password: {e}")))
}

/// Checks `password` against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash
/// cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| StaySmartError::auth(format!("Stored password hash is malformed: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Creates an account for `role` unless the username or email is taken.
pub async fn signup(
    db: &StaySmartDb,
    role: Role,
    request: &SignupRequest,
) -> Result<SignupOutcome> {
    if users::username_exists(db, &request.username).await? {
        debug!(username = %request.username, "signup rejected: username taken");
        return Ok(SignupOutcome::rejected(USERNAME_TAKEN));
    }
    if users::email_exists(db, &request.email).await? {
        debug!("signup rejected: email taken");
        return Ok(SignupOutcome::rejected(EMAIL_TAKEN));
    }

    let password_hash = hash_password(&request.password)?;
    let user_id = users::create_user(
        db,
        &NewUser {
            role,
            fullname: request.fullname.clone(),
            username: request.username.clone(),
            email: request.email.clone(),
            contact_no: request.contact_no.clone(),
            password_hash,
        },
    )
    .await?;

    info!(user_id, %role, "account created");
    let message = match role {
        Role::Tenant => "Signup successful!",
        Role::Owner => "Owner signup successful!",
    };
    Ok(SignupOutcome {
        success: true,
        message: message.to_string(),
        user_id: Some(user_id),
    })
}

pub async fn tenant_signup(db: &StaySmartDb, request: &SignupRequest) -> Result<SignupOutcome> {
    signup(db, Role::Tenant, request).await
}

pub async fn owner_signup(db: &StaySmartDb, request: &SignupRequest) -> Result<SignupOutcome> {
    signup(db, Role::Owner, request).await
}

/// Authenticates an active account.
pub async fn login(db: &StaySmartDb, username: &str, password: &str) -> Result<LoginOutcome> {
    let Some(user) = users::get_user_by_username(db, username).await? else {
        return Ok(LoginOutcome::failed());
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => {
            info!(user_id = user.user_id, role = %user.role, "login succeeded");
            Ok(LoginOutcome::Success {
                user_id: user.user_id,
                role: user.role,
            })
        }
        Ok(false) => Ok(LoginOutcome::failed()),
        Err(e) => {
            warn!(user_id = user.user_id, "{e}");
            Ok(LoginOutcome::failed())
        }
    }
}

/// Like [`login`], but only succeeds for accounts holding `role`.
pub async fn login_as(
    db: &StaySmartDb,
    role: Role,
    username: &str,
    password: &str,
) -> Result<LoginOutcome> {
    match login(db, username, password).await? {
        LoginOutcome::Success { role: actual, .. } if actual != role => Ok(LoginOutcome::failed()),
        outcome => Ok(outcome),
    }
}

/// Role registered under `email`; used by the password reset flow.
pub async fn email_role(db: &StaySmartDb, email: &str) -> Result<Option<Role>> {
    users::email_role(db, email).await
}
