//! HTTP surface: router assembly, shared state, and the session extractor.

mod auth_routes;
mod content;
mod error;
mod uploads;
pub mod validate;

pub use error::{constraint_status_code, ApiError};

use crate::auth::{validate_session, AuthError};
use crate::cache::ResponseCache;
use crate::config::ServerConfig;
use crate::store::ContentStore;
use axum::extract::{DefaultBodyLimit, FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body, 10 MiB (covers multipart uploads).
const MAX_BODY_BYTES: usize = 10_485_760;

/// Shared application state.
pub struct AppState {
    pub store: ContentStore,
    pub cache: ResponseCache,
    pub pool: PgPool,
    pub config: ServerConfig,
}

/// An authenticated admin request.
///
/// Extracting this validates the bearer token against the sessions table;
/// handlers that take it are only reached with a live session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

/// Pull the bearer token out of an `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or(AuthError::MissingToken)?
            .to_string();
        let context = validate_session(&state.pool, &token).await?;
        let context = context.ok_or(AuthError::InvalidToken)?;
        Ok(AuthSession {
            user_id: context.user_id,
            username: context.username,
            token,
        })
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let content_types: Vec<&str> = state
        .store
        .registry()
        .types()
        .iter()
        .map(|t| t.table.as_str())
        .collect();
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "contentTypes": content_types,
        "endpoints": ["/health", "/api/auth", "/api/uploads", "/api/cache/stats"],
    }))
}

async fn cache_stats(
    State(state): State<Arc<AppState>>,
    _session: AuthSession,
) -> impl IntoResponse {
    Json(state.cache.stats())
}

async fn cache_clear(
    State(state): State<Arc<AppState>>,
    _session: AuthSession,
) -> impl IntoResponse {
    state.cache.clear();
    Json(json!({ "cleared": true }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not found" })),
    )
}

/// Assemble the full application router.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache/clear", post(cache_clear))
        .nest("/api/auth", auth_routes::router())
        .nest("/api/uploads", uploads::router());

    for config in state.store.registry().types() {
        let path = format!("/api/{}", config.table);
        router = router.nest(&path, content::routes(config.table.clone()));
    }

    router
        .nest_service("/uploads", ServeDir::new(&state.config.uploads_dir))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc-123"));
        assert_eq!(bearer_token(&headers), Some("abc-123"));
    }

    #[test]
    fn test_bearer_token_missing_or_malformed() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
