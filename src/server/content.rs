//! Handlers for the per-content-type routes (`/api/projects`, ...).
//!
//! GET responses pass through the TTL cache with an `x-cache` header;
//! mutations require a session and invalidate every cached page of their
//! content type.

use crate::cache::cache_key;
use crate::server::{validate, ApiError, AppState, AuthSession};
use crate::store::ListQuery;
use axum::extract::{Extension, OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Table name injected into each nested content router.
#[derive(Debug, Clone)]
pub struct ContentTable(pub String);

/// Routes for one content type, mounted under `/api/<table>`.
#[must_use]
pub fn routes(table: String) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(delete_one))
        .route("/slug/{slug}", get(get_by_slug))
        .layer(Extension(ContentTable(table)))
}

fn json_response(body: Vec<u8>, cache_status: &'static str) -> Response {
    (
        [
            ("content-type", "application/json"),
            ("x-cache", cache_status),
        ],
        body,
    )
        .into_response()
}

fn parse_i64(params: &HashMap<String, String>, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.parse().ok())
}

fn parse_f64(params: &HashMap<String, String>, key: &str) -> Option<f64> {
    params.get(key).and_then(|v| v.parse().ok())
}

fn list_query_from_params(
    state: &AppState,
    table: &str,
    params: &HashMap<String, String>,
) -> Result<ListQuery, ApiError> {
    let config = state
        .store
        .registry()
        .get(table)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown content type: {table}")))?;

    let filters = config
        .filters
        .iter()
        .filter_map(|(name, _)| {
            params
                .get(name)
                .map(|value| (name.clone(), value.clone()))
        })
        .collect();

    Ok(ListQuery {
        offset: parse_i64(params, "offset").unwrap_or(0).max(0),
        limit: parse_i64(params, "limit")
            .unwrap_or(state.config.default_page_size)
            .clamp(1, 100),
        search: params.get("search").cloned(),
        filters,
        order_by: params.get("orderBy").cloned(),
        min_numeric: parse_f64(params, "minPrice"),
        max_numeric: parse_f64(params, "maxPrice"),
    })
}

fn encode_body<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(value).map_err(|e| ApiError::Internal(e.to_string()))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Extension(ContentTable(table)): Extension<ContentTable>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let key = cache_key("GET", uri.path(), uri.query());
    if let Some(body) = state.cache.get(&key) {
        return Ok(json_response(body.to_vec(), "HIT"));
    }

    let query = list_query_from_params(&state, &table, &params)?;
    let page = state.store.list(&table, &query).await?;
    let body = encode_body(&page)?;
    state.cache.set(&key, &body);
    Ok(json_response(body, "MISS"))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(ContentTable(table)): Extension<ContentTable>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let key = cache_key("GET", uri.path(), uri.query());
    if let Some(body) = state.cache.get(&key) {
        return Ok(json_response(body.to_vec(), "HIT"));
    }

    let record = state
        .store
        .get_by_id(&table, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let body = encode_body(&record)?;
    state.cache.set(&key, &body);
    Ok(json_response(body, "MISS"))
}

async fn get_by_slug(
    State(state): State<Arc<AppState>>,
    Extension(ContentTable(table)): Extension<ContentTable>,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let key = cache_key("GET", uri.path(), uri.query());
    if let Some(body) = state.cache.get(&key) {
        return Ok(json_response(body.to_vec(), "HIT"));
    }

    let record = state
        .store
        .get_by_slug(&table, &slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    let body = encode_body(&record)?;
    state.cache.set(&key, &body);
    Ok(json_response(body, "MISS"))
}

fn invalidate(state: &AppState, table: &str) {
    let removed = state.cache.clear_prefix(&format!("GET:/api/{table}"));
    if removed > 0 {
        info!(table, removed, "cache invalidated");
    }
}

async fn create(
    State(state): State<Arc<AppState>>,
    Extension(ContentTable(table)): Extension<ContentTable>,
    session: AuthSession,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let payload = validate::prepare_create(payload)?;
    let record = state.store.create(&table, &payload).await?;
    invalidate(&state, &table);
    info!(table, id = record.id, by = %session.username, "record created");
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn update(
    State(state): State<Arc<AppState>>,
    Extension(ContentTable(table)): Extension<ContentTable>,
    session: AuthSession,
    Path(id): Path<i64>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let payload = validate::prepare_update(payload)?;
    let record = state
        .store
        .update(&table, id, &payload)
        .await?
        .ok_or(ApiError::NotFound)?;
    invalidate(&state, &table);
    info!(table, id, by = %session.username, "record updated");
    Ok(Json(record).into_response())
}

async fn delete_one(
    State(state): State<Arc<AppState>>,
    Extension(ContentTable(table)): Extension<ContentTable>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let removed = state.store.delete(&table, id).await?;
    if !removed {
        return Err(ApiError::NotFound);
    }
    invalidate(&state, &table);
    info!(table, id, by = %session.username, "record deleted");
    Ok(Json(json!({ "deleted": true })).into_response())
}
