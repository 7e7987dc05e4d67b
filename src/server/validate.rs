//! Payload validation and sanitization for content writes.
//!
//! Runs before the store sees a payload: title rules, price bounds, and
//! control-character stripping on every string value.

use crate::server::ApiError;
use crate::utils::sanitize_string;
use serde_json::{Map, Value};

const MAX_TITLE_LEN: usize = 255;
const ALLOWED_STATUSES: &[&str] = &["draft", "published", "archived"];

fn as_object(payload: Value) -> Result<Map<String, Value>, ApiError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest("request body must be a JSON object".to_string())),
    }
}

fn check_title(value: &Value) -> Result<(), ApiError> {
    let Some(title) = value.as_str() else {
        return Err(ApiError::BadRequest("title must be a string".to_string()));
    };
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::BadRequest(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn check_price(value: &Value) -> Result<(), ApiError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => return Ok(()),
        _ => None,
    };
    match number {
        Some(n) if n >= 0.0 && n.is_finite() => Ok(()),
        _ => Err(ApiError::BadRequest(
            "price must be a non-negative number".to_string(),
        )),
    }
}

fn check_status(value: &Value) -> Result<(), ApiError> {
    match value.as_str() {
        Some(s) if ALLOWED_STATUSES.contains(&s) => Ok(()),
        _ => Err(ApiError::BadRequest(
            "status must be one of draft, published, archived".to_string(),
        )),
    }
}

/// Strip control characters from every string value, including strings
/// inside arrays (tags).
fn sanitize_fields(payload: &mut Map<String, Value>) {
    for value in payload.values_mut() {
        match value {
            Value::String(s) => *s = sanitize_string(s),
            Value::Array(items) => {
                for item in &mut *items {
                    if let Value::String(s) = item {
                        *s = sanitize_string(s);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Validate and sanitize a create payload. Title is required.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] for a non-object body, a missing or
/// invalid title, or a negative price.
pub fn prepare_create(payload: Value) -> Result<Map<String, Value>, ApiError> {
    let mut payload = as_object(payload)?;
    let title = payload
        .get("title")
        .ok_or_else(|| ApiError::BadRequest("title is required".to_string()))?;
    check_title(title)?;
    if let Some(price) = payload.get("price") {
        check_price(price)?;
    }
    if let Some(status) = payload.get("status") {
        check_status(status)?;
    }
    sanitize_fields(&mut payload);
    Ok(payload)
}

/// Validate and sanitize an update payload. Fields are optional but must be
/// valid when present.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] for a non-object body or invalid
/// title/price values.
pub fn prepare_update(payload: Value) -> Result<Map<String, Value>, ApiError> {
    let mut payload = as_object(payload)?;
    if let Some(title) = payload.get("title") {
        check_title(title)?;
    }
    if let Some(price) = payload.get("price") {
        check_price(price)?;
    }
    if let Some(status) = payload.get("status") {
        check_status(status)?;
    }
    sanitize_fields(&mut payload);
    Ok(payload)
}
