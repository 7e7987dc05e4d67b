//! Session token lifecycle: issue on login, validate on each request,
//! revoke on logout, and sweep expired rows.

use crate::auth::{verify_password, AdminUser, AuthError};
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

/// The authenticated identity attached to a validated token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub username: String,
}

fn session_expiry(ttl_hours: i64) -> DateTime<Utc> {
    let ttl = TimeDelta::try_hours(ttl_hours).unwrap_or_else(TimeDelta::zero);
    Utc::now()
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Verify credentials and issue an opaque session token.
///
/// The token is a random UUID stored server-side with its expiry; nothing
/// about the user is encoded in it.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] for an unknown or inactive
/// user or a wrong password. Which of the two failed is not revealed.
pub async fn login(
    pool: &PgPool,
    username: &str,
    password: String,
    ttl_hours: i64,
) -> Result<LoginResult, AuthError> {
    let user: Option<AdminUser> = sqlx::query_as(
        "SELECT id, username, password_hash, is_active FROM admin_users \
         WHERE username = $1 AND is_active",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    let Some(user) = user else {
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredentials);
    }

    let token = Uuid::new_v4().to_string();
    let expires_at = session_expiry(ttl_hours);

    sqlx::query("INSERT INTO admin_sessions (user_id, token, expires_at) VALUES ($1, $2, $3)")
        .bind(user.id)
        .bind(&token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    info!(username = %user.username, "admin logged in");
    Ok(LoginResult {
        token,
        expires_at,
        username: user.username,
    })
}

/// Resolve a bearer token to its user. `Ok(None)` means the token is
/// unknown, expired, or belongs to a deactivated user.
///
/// # Errors
///
/// Returns a database error if the lookup fails.
pub async fn validate_session(
    pool: &PgPool,
    token: &str,
) -> Result<Option<AuthContext>, AuthError> {
    let row: Option<(i64, String, DateTime<Utc>)> = sqlx::query_as(
        "SELECT u.id, u.username, s.expires_at FROM admin_sessions s \
         JOIN admin_users u ON u.id = s.user_id \
         WHERE s.token = $1 AND s.expires_at > NOW() AND u.is_active",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(user_id, username, expires_at)| AuthContext {
        user_id,
        username,
        expires_at,
    }))
}

/// Revoke a session token. Returns whether a session existed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn logout(pool: &PgPool, token: &str) -> Result<bool, AuthError> {
    let result = sqlx::query("DELETE FROM admin_sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete expired session rows. Returns how many were removed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn cleanup_expired_sessions(pool: &PgPool) -> Result<u64, AuthError> {
    let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    let removed = result.rows_affected();
    debug!(removed, "expired sessions swept");
    Ok(removed)
}
