//! Admin session endpoints under `/api/auth`.

use crate::auth;
use crate::server::{ApiError, AppState, AuthSession};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

#[must_use]
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/change-password", post(change_password))
        .route("/cleanup-sessions", post(cleanup_sessions))
}

fn required_str<'a>(payload: &'a Value, field: &str) -> Result<&'a str, ApiError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let username = required_str(&payload, "username")?;
    let password = required_str(&payload, "password")?;

    let result = auth::login(
        &state.pool,
        username,
        password.to_string(),
        state.config.session_ttl_hours,
    )
    .await?;

    Ok(Json(json!({
        "token": result.token,
        "expiresAt": result.expires_at,
        "username": result.username,
    })))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<impl IntoResponse, ApiError> {
    auth::logout(&state.pool, &session.token).await?;
    Ok(Json(json!({ "loggedOut": true })))
}

async fn me(session: AuthSession) -> impl IntoResponse {
    Json(json!({
        "id": session.user_id,
        "username": session.username,
    }))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let current = required_str(&payload, "currentPassword")?;
    let new = required_str(&payload, "newPassword")?;

    auth::change_password(
        &state.pool,
        session.user_id,
        current.to_string(),
        new.to_string(),
    )
    .await?;

    Ok(Json(json!({ "changed": true })))
}

async fn cleanup_sessions(
    State(state): State<Arc<AppState>>,
    _session: AuthSession,
) -> Result<impl IntoResponse, ApiError> {
    let removed = auth::cleanup_expired_sessions(&state.pool).await?;
    Ok(Json(json!({ "removed": removed })))
}
