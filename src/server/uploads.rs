//! File upload endpoints under `/api/uploads`.
//!
//! Stored names are content-addressed (truncated SHA-256 plus the original
//! extension), so re-uploading the same file is idempotent and names are
//! never attacker-controlled. Files are served back via `/uploads`.

use crate::server::{ApiError, AppState, AuthSession};
use crate::utils::{file_extension, safe_filename, sha256_hex};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];
const MAX_FILES_PER_REQUEST: usize = 10;
const STORED_NAME_HASH_LEN: usize = 16;

#[must_use]
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(upload_single).get(list_files))
        .route("/multiple", post(upload_multiple))
        .route("/{filename}", delete(delete_file))
}

fn stored_name(original: Option<&str>, data: &[u8]) -> Result<String, ApiError> {
    let ext = original
        .and_then(file_extension)
        .ok_or_else(|| ApiError::BadRequest("file must have an extension".to_string()))?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "file type .{ext} is not allowed"
        )));
    }
    let hash = sha256_hex(data);
    let prefix = hash.get(..STORED_NAME_HASH_LEN).unwrap_or(&hash);
    Ok(format!("{prefix}.{ext}"))
}

async fn save_file(
    state: &AppState,
    original: Option<&str>,
    data: &[u8],
) -> Result<Value, ApiError> {
    if data.is_empty() {
        return Err(ApiError::BadRequest("file is empty".to_string()));
    }
    let name = stored_name(original, data)?;
    let path = state.config.uploads_dir.join(&name);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(json!({
        "filename": name,
        "url": format!("/uploads/{name}"),
        "size": data.len(),
    }))
}

async fn upload_single(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let original = field.file_name().map(ToString::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let file = save_file(&state, original.as_deref(), &data).await?;
        let name = file.get("filename").and_then(Value::as_str).unwrap_or("");
        info!(by = %session.username, filename = %name, "file uploaded");
        return Ok((StatusCode::CREATED, Json(file)));
    }
    Err(ApiError::BadRequest("missing \"image\" field".to_string()))
}

async fn upload_multiple(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("images") {
            continue;
        }
        if files.len() >= MAX_FILES_PER_REQUEST {
            return Err(ApiError::BadRequest(format!(
                "at most {MAX_FILES_PER_REQUEST} files per request"
            )));
        }
        let original = field.file_name().map(ToString::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        files.push(save_file(&state, original.as_deref(), &data).await?);
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("missing \"images\" field".to_string()));
    }
    info!(by = %session.username, count = files.len(), "files uploaded");
    Ok((StatusCode::CREATED, Json(json!({ "files": files }))))
}

async fn list_files(
    State(state): State<Arc<AppState>>,
    _session: AuthSession,
) -> Result<impl IntoResponse, ApiError> {
    let mut entries = tokio::fs::read_dir(&state.config.uploads_dir)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut files: Vec<(DateTime<Utc>, Value)> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let modified: DateTime<Utc> = metadata
            .modified()
            .map_or_else(|_| Utc::now(), DateTime::from);
        files.push((
            modified,
            json!({
                "filename": name,
                "url": format!("/uploads/{name}"),
                "size": metadata.len(),
                "modifiedAt": modified,
            }),
        ));
    }

    // newest first
    files.sort_by(|a, b| b.0.cmp(&a.0));
    let files: Vec<Value> = files.into_iter().map(|(_, v)| v).collect();
    Ok(Json(json!({ "files": files })))
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = safe_filename(&filename)
        .ok_or_else(|| ApiError::BadRequest("invalid filename".to_string()))?;
    let path = state.config.uploads_dir.join(name);

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            info!(by = %session.username, filename = %name, "file deleted");
            Ok(Json(json!({ "deleted": true })))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}
