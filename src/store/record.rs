//! Content records and payload handling.
//!
//! Write payloads arrive as loose JSON; everything here narrows them to the
//! whitelisted, typed shape the store executes.

use crate::config::{ContentTypeConfig, FieldKind, LIFECYCLE_COLUMNS};
use crate::store::query::BindValue;
use crate::store::StoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::Row;

/// A stored content record.
///
/// The lifecycle columns are explicit; type-specific columns (price, author,
/// content, ...) ride in `extra` and are flattened into the JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord {
    pub id: i64,
    pub title: String,
    pub slug: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Convert one JSON payload value to a typed bind for the given column kind.
///
/// # Errors
///
/// Returns [`StoreError::InvalidValue`] when the value does not fit the
/// column's type.
pub fn bind_from_json(
    column: &str,
    kind: FieldKind,
    value: &Value,
) -> Result<BindValue, StoreError> {
    if value.is_null() {
        return Ok(BindValue::Null(kind));
    }

    let invalid = |expected: &'static str| StoreError::InvalidValue {
        column: column.to_string(),
        expected,
    };

    match kind {
        FieldKind::Text => value
            .as_str()
            .map(|s| BindValue::Text(s.to_string()))
            .ok_or_else(|| invalid("string")),
        FieldKind::Float => match value {
            Value::Number(n) => n.as_f64().map(BindValue::Float).ok_or_else(|| invalid("number")),
            // numeric strings are common from form frontends
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(BindValue::Float)
                .map_err(|_| invalid("number")),
            _ => Err(invalid("number")),
        },
        FieldKind::Bool => value
            .as_bool()
            .map(BindValue::Bool)
            .ok_or_else(|| invalid("boolean")),
        FieldKind::TextArray => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(ToString::to_string)
                        .ok_or_else(|| invalid("array of strings"))
                })
                .collect::<Result<Vec<String>, StoreError>>()
                .map(BindValue::TextArray),
            Value::String(s) => Ok(BindValue::TextArray(vec![s.clone()])),
            _ => Err(invalid("array of strings")),
        },
        FieldKind::Date => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(BindValue::Date)
            .ok_or_else(|| invalid("date (YYYY-MM-DD)")),
        FieldKind::Timestamp => value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| BindValue::Timestamp(dt.with_timezone(&Utc)))
            .ok_or_else(|| invalid("RFC 3339 timestamp")),
    }
}

/// Reduce a write payload to whitelisted columns with typed binds.
///
/// Unknown keys are silently dropped. Column order follows the config so
/// placeholder numbering is stable.
///
/// # Errors
///
/// Returns [`StoreError::NoValidFields`] when nothing survives filtering,
/// or [`StoreError::InvalidValue`] for a value of the wrong type.
pub fn filter_allowed_fields(
    config: &ContentTypeConfig,
    payload: &Map<String, Value>,
) -> Result<Vec<(String, BindValue)>, StoreError> {
    let mut fields = Vec::new();
    for column in &config.columns {
        if let Some(value) = payload.get(&column.name) {
            let bind = bind_from_json(&column.name, column.kind, value)?;
            fields.push((column.name.clone(), bind));
        }
    }
    if fields.is_empty() {
        return Err(StoreError::NoValidFields);
    }
    Ok(fields)
}

/// What to do with `published_at` for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStamp {
    /// Entering `published`: stamp the current time.
    Set,
    /// Leaving `published`: clear the timestamp.
    Clear,
    /// No transition across the published boundary.
    Keep,
}

/// Decide the `published_at` action for a status transition.
#[must_use]
pub fn publish_transition(previous: Option<&str>, next: Option<&str>) -> PublishStamp {
    let was_published = previous == Some("published");
    let is_published = next == Some("published");
    match (was_published, is_published) {
        (false, true) => PublishStamp::Set,
        (true, false) => PublishStamp::Clear,
        _ => PublishStamp::Keep,
    }
}

/// Offset/limit pagination metadata.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
    pub has_more: bool,
}

/// Compute pagination metadata for a page.
#[must_use]
pub fn page_meta(offset: i64, limit: i64, total: i64) -> Pagination {
    Pagination {
        offset,
        limit,
        total,
        has_more: offset.saturating_add(limit) < total,
    }
}

/// One page of list results.
#[derive(Debug, Serialize)]
pub struct ListPage {
    pub items: Vec<ContentRecord>,
    pub pagination: Pagination,
}

fn extra_value(row: &PgRow, name: &str, kind: FieldKind) -> Result<Value, sqlx::Error> {
    let value = match kind {
        FieldKind::Text => row
            .try_get::<Option<String>, _>(name)?
            .map_or(Value::Null, Value::String),
        FieldKind::Float => row
            .try_get::<Option<f64>, _>(name)?
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number),
        FieldKind::Bool => row
            .try_get::<Option<bool>, _>(name)?
            .map_or(Value::Null, Value::Bool),
        FieldKind::TextArray => row.try_get::<Option<Vec<String>>, _>(name)?.map_or(
            Value::Null,
            |items| Value::Array(items.into_iter().map(Value::String).collect()),
        ),
        FieldKind::Date => row
            .try_get::<Option<NaiveDate>, _>(name)?
            .map_or(Value::Null, |d| Value::String(d.format("%Y-%m-%d").to_string())),
        FieldKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(name)?
            .map_or(Value::Null, |ts| Value::String(ts.to_rfc3339())),
    };
    Ok(value)
}

/// Decode a database row into a [`ContentRecord`] using the type's column
/// kinds for the non-lifecycle columns.
///
/// # Errors
///
/// Returns a [`StoreError::Database`] when a column is missing or has an
/// unexpected type.
pub fn record_from_row(config: &ContentTypeConfig, row: &PgRow) -> Result<ContentRecord, StoreError> {
    let mut extra = Map::new();
    for column in &config.columns {
        if LIFECYCLE_COLUMNS.contains(&column.name.as_str()) {
            continue;
        }
        extra.insert(
            column.name.clone(),
            extra_value(row, &column.name, column.kind)?,
        );
    }

    Ok(ContentRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        status: row.try_get("status")?,
        tags: row.try_get("tags")?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        extra,
    })
}
