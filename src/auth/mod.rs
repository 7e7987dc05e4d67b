//! Admin authentication: bcrypt password handling and opaque session tokens.

mod sessions;

pub use sessions::{
    cleanup_expired_sessions, login, logout, validate_session, AuthContext, LoginResult,
};

use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid or expired session")]
    InvalidToken,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// An admin account row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
}

/// Hash a password with bcrypt on a blocking thread.
///
/// # Errors
///
/// Returns an error if hashing fails or the blocking task is cancelled.
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await??;
    Ok(hash)
}

/// Verify a password against a bcrypt hash on a blocking thread.
///
/// # Errors
///
/// Returns an error if verification fails to run.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(ok)
}

/// Change a user's password after verifying the current one.
///
/// All of the user's sessions are revoked so stolen tokens stop working.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] when the current password does
/// not match, [`AuthError::WeakPassword`] for short replacements, or a
/// database error.
pub async fn change_password(
    pool: &PgPool,
    user_id: i64,
    current_password: String,
    new_password: String,
) -> Result<(), AuthError> {
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }

    let current_hash: Option<String> =
        sqlx::query_scalar("SELECT password_hash FROM admin_users WHERE id = $1 AND is_active")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    let Some(current_hash) = current_hash else {
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(current_password, current_hash).await? {
        return Err(AuthError::InvalidCredentials);
    }

    let new_hash = hash_password(new_password).await?;
    sqlx::query("UPDATE admin_users SET password_hash = $1 WHERE id = $2")
        .bind(&new_hash)
        .bind(user_id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM admin_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    info!(user_id, "password changed, sessions revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify_round_trip() {
        let hash = hash_password("hunter22".to_string()).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("hunter22".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[test]
    fn test_error_messages_do_not_leak_which_field_failed() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "invalid username or password"
        );
    }

    #[test]
    fn test_weak_password_threshold() {
        assert_eq!(MIN_PASSWORD_LEN, 6);
    }
}
