//! HTTP error mapping for the JSON API.

use crate::auth::AuthError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API-level error with an HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details go to the log, not the client.
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(%detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Map a PostgreSQL error code to a client-facing status, if it indicates a
/// client mistake.
#[must_use]
pub fn constraint_status_code(code: &str) -> Option<StatusCode> {
    match code {
        // unique_violation
        "23505" => Some(StatusCode::CONFLICT),
        // foreign_key_violation, not_null_violation, invalid_text_representation
        "23503" | "23502" | "22P02" => Some(StatusCode::BAD_REQUEST),
        _ => None,
    }
}

fn from_db_error(err: &sqlx::Error) -> Option<ApiError> {
    let db_err = err.as_database_error()?;
    let code = db_err.code()?;
    match constraint_status_code(&code)? {
        StatusCode::CONFLICT => Some(ApiError::Conflict(
            "a record with this value already exists".to_string(),
        )),
        StatusCode::BAD_REQUEST => Some(ApiError::BadRequest("invalid reference or value".to_string())),
        _ => None,
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidTable(table) => {
                ApiError::BadRequest(format!("unknown content type: {table}"))
            }
            StoreError::NoValidFields => {
                ApiError::BadRequest("no valid fields to save".to_string())
            }
            StoreError::InvalidValue { column, expected } => {
                ApiError::BadRequest(format!("invalid value for {column}: expected {expected}"))
            }
            StoreError::Database(db) => {
                from_db_error(&db).unwrap_or_else(|| ApiError::Internal(db.to_string()))
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken => ApiError::Unauthorized(err.to_string()),
            AuthError::WeakPassword => ApiError::BadRequest(err.to_string()),
            AuthError::Hash(_) | AuthError::Database(_) | AuthError::Task(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        from_db_error(&err).unwrap_or_else(|| ApiError::Internal(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized(String::new()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Conflict(String::new()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_constraint_codes() {
        assert_eq!(constraint_status_code("23505"), Some(StatusCode::CONFLICT));
        assert_eq!(
            constraint_status_code("23503"),
            Some(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            constraint_status_code("22P02"),
            Some(StatusCode::BAD_REQUEST)
        );
        assert_eq!(constraint_status_code("42P01"), None);
    }

    #[test]
    fn test_store_error_mapping() {
        let err: ApiError = StoreError::NoValidFields.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = StoreError::InvalidTable("users".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_error_mapping() {
        let err: ApiError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::WeakPassword.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err = ApiError::Internal("connection refused to 10.0.0.5".to_string());
        assert_eq!(err.to_string(), "internal server error");
    }
}
