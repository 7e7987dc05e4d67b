//! Generic CRUD over the whitelisted content tables.

use crate::config::{ContentTypeConfig, ContentTypeRegistry};
use crate::store::query::{bind_all, build_list_query, BindValue, ListQuery};
use crate::store::record::{
    filter_allowed_fields, page_meta, publish_transition, record_from_row, ContentRecord, ListPage,
    PublishStamp,
};
use crate::store::{slug, StoreError};
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use tracing::debug;

/// Remove a blank `slug` value from a write payload. A blank slug means the
/// caller did not choose one, never a request to erase the stored slug.
fn strip_blank_slug(payload: &mut Map<String, Value>) {
    let blank = payload
        .get("slug")
        .and_then(Value::as_str)
        .is_some_and(|s| s.trim().is_empty());
    if blank {
        payload.remove("slug");
    }
}

/// The generic record store.
///
/// One instance serves every registered content type; the registry passed at
/// construction is the only source of table and column names.
#[derive(Debug, Clone)]
pub struct ContentStore {
    pool: PgPool,
    registry: ContentTypeRegistry,
}

impl ContentStore {
    #[must_use]
    pub fn new(pool: PgPool, registry: ContentTypeRegistry) -> Self {
        Self { pool, registry }
    }

    #[must_use]
    pub fn registry(&self) -> &ContentTypeRegistry {
        &self.registry
    }

    fn config(&self, table: &str) -> Result<&ContentTypeConfig, StoreError> {
        self.registry
            .get(table)
            .ok_or_else(|| StoreError::InvalidTable(table.to_string()))
    }

    /// List records with filtering, search, ordering and pagination.
    ///
    /// The page rows and the filtered total are fetched concurrently with
    /// identical predicates.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTable`] for unknown tables, or a
    /// database error.
    pub async fn list(&self, table: &str, query: &ListQuery) -> Result<ListPage, StoreError> {
        let config = self.config(table)?;
        let stmts = build_list_query(config, query);
        debug!(table, sql = %stmts.select_sql, "list query");

        let select = bind_all(sqlx::query(&stmts.select_sql), &stmts.select_binds)
            .fetch_all(&self.pool);
        let count =
            bind_all(sqlx::query(&stmts.count_sql), &stmts.count_binds).fetch_one(&self.pool);
        let (rows, count_row) = tokio::try_join!(select, count)?;

        let total: i64 = count_row.try_get(0)?;
        let items = rows
            .iter()
            .map(|row| record_from_row(config, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListPage {
            items,
            pagination: page_meta(query.offset, query.limit, total),
        })
    }

    /// Fetch one record by id. `Ok(None)` means not found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTable`] for unknown tables, or a
    /// database error.
    pub async fn get_by_id(
        &self,
        table: &str,
        id: i64,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let config = self.config(table)?;
        let sql = format!("SELECT * FROM {} WHERE id = $1", config.table);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| record_from_row(config, &r)).transpose()
    }

    /// Fetch one record by slug. `Ok(None)` means not found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTable`] for unknown tables, or a
    /// database error.
    pub async fn get_by_slug(
        &self,
        table: &str,
        slug_value: &str,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let config = self.config(table)?;
        let sql = format!("SELECT * FROM {} WHERE slug = $1", config.table);
        let row = sqlx::query(&sql)
            .bind(slug_value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| record_from_row(config, &r)).transpose()
    }

    /// Find the first free slug for `base` by probing `base`, `base-1`,
    /// `base-2`, ... Excludes `exclude_id` so a record can keep its own slug.
    ///
    /// # Errors
    ///
    /// Returns a database error if a probe query fails.
    pub async fn ensure_unique_slug(
        &self,
        config: &ContentTypeConfig,
        base: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, StoreError> {
        let sql = match exclude_id {
            Some(_) => format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1 AND id <> $2)",
                config.table
            ),
            None => format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1)",
                config.table
            ),
        };

        let mut attempt: u32 = 0;
        loop {
            let candidate = slug::candidate(base, attempt);
            let mut query = sqlx::query_scalar::<_, bool>(&sql).bind(&candidate);
            if let Some(id) = exclude_id {
                query = query.bind(id);
            }
            let taken = query.fetch_one(&self.pool).await?;
            if !taken {
                return Ok(candidate);
            }
            attempt = attempt.saturating_add(1);
        }
    }

    /// Work out the slug for a new record: an explicit slug wins, otherwise
    /// the title is normalized, and the result is uniquified either way.
    ///
    /// Returns `None` when nothing normalizes to a usable base (a title of
    /// only punctuation, say); the record is then stored without a slug
    /// rather than probing suffixes on an empty base.
    async fn resolve_slug_for_create(
        &self,
        config: &ContentTypeConfig,
        payload: &Map<String, Value>,
    ) -> Result<Option<String>, StoreError> {
        let explicit = payload.get("slug").and_then(Value::as_str);
        let base = match explicit {
            Some(s) if !s.trim().is_empty() => slug::normalize(s),
            _ => match payload.get("title").and_then(Value::as_str) {
                Some(title) => slug::normalize(title),
                None => return Ok(None),
            },
        };
        if base.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.ensure_unique_slug(config, &base, None).await?))
    }

    /// Insert a record.
    ///
    /// The slug is derived from the title when absent and uniquified either
    /// way; creating directly as `published` stamps `published_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTable`], [`StoreError::NoValidFields`]
    /// when nothing in the payload is whitelisted, or a database error.
    pub async fn create(
        &self,
        table: &str,
        payload: &Map<String, Value>,
    ) -> Result<ContentRecord, StoreError> {
        let config = self.config(table)?;

        let mut payload = payload.clone();
        strip_blank_slug(&mut payload);
        match self.resolve_slug_for_create(config, &payload).await? {
            Some(final_slug) => {
                payload.insert("slug".to_string(), Value::String(final_slug));
            }
            // No usable base: whatever slug value remains is unnormalizable
            // and must not reach the table verbatim.
            None => {
                payload.remove("slug");
            }
        }

        let mut fields = filter_allowed_fields(config, &payload)?;

        let next_status = payload.get("status").and_then(Value::as_str);
        if publish_transition(None, next_status) == PublishStamp::Set {
            fields.push((
                "published_at".to_string(),
                BindValue::Timestamp(Utc::now()),
            ));
        }

        let columns: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            config.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        debug!(table, sql = %sql, "insert");

        let binds: Vec<BindValue> = fields.into_iter().map(|(_, bind)| bind).collect();
        let row = bind_all(sqlx::query(&sql), &binds)
            .fetch_one(&self.pool)
            .await?;
        record_from_row(config, &row)
    }

    /// Update a record by id. `Ok(None)` means the record does not exist.
    ///
    /// A changed title regenerates the slug (unless an explicit slug is
    /// supplied); status transitions across `published` stamp or clear
    /// `published_at`; `updated_at` is always refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTable`], [`StoreError::NoValidFields`],
    /// or a database error.
    pub async fn update(
        &self,
        table: &str,
        id: i64,
        payload: &Map<String, Value>,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let config = self.config(table)?;
        let Some(existing) = self.get_by_id(table, id).await? else {
            return Ok(None);
        };

        let mut payload = payload.clone();
        strip_blank_slug(&mut payload);

        let explicit_slug = payload
            .get("slug")
            .and_then(Value::as_str)
            .map(slug::normalize);
        let new_title = payload
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| *t != existing.title);

        let slug_base = match (explicit_slug, new_title) {
            (Some(s), _) => Some(s),
            (None, Some(title)) => Some(slug::normalize(title)),
            (None, None) => None,
        };
        match slug_base {
            Some(base) if !base.is_empty() => {
                let unique = self.ensure_unique_slug(config, &base, Some(id)).await?;
                payload.insert("slug".to_string(), Value::String(unique));
            }
            // Slug or title normalized to nothing; drop the key so the raw
            // value is never written and the stored slug stays untouched.
            Some(_) => {
                payload.remove("slug");
            }
            None => {}
        }

        let mut fields = filter_allowed_fields(config, &payload)?;

        if payload.contains_key("status") {
            let next_status = payload.get("status").and_then(Value::as_str);
            match publish_transition(existing.status.as_deref(), next_status) {
                PublishStamp::Set => fields.push((
                    "published_at".to_string(),
                    BindValue::Timestamp(Utc::now()),
                )),
                PublishStamp::Clear => fields.push((
                    "published_at".to_string(),
                    BindValue::Null(crate::config::FieldKind::Timestamp),
                )),
                PublishStamp::Keep => {}
            }
        }

        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ${}", name, i.saturating_add(1)))
            .collect();
        let id_placeholder = fields.len().saturating_add(1);
        let sql = format!(
            "UPDATE {} SET {}, updated_at = NOW() WHERE id = ${} RETURNING *",
            config.table,
            assignments.join(", "),
            id_placeholder
        );
        debug!(table, id, sql = %sql, "update");

        let binds: Vec<BindValue> = fields.into_iter().map(|(_, bind)| bind).collect();
        let row = bind_all(sqlx::query(&sql), &binds)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| record_from_row(config, &r)).transpose()
    }

    /// Delete a record by id. Returns whether a row was removed; deleting a
    /// missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTable`] or a database error.
    pub async fn delete(&self, table: &str, id: i64) -> Result<bool, StoreError> {
        let config = self.config(table)?;
        let sql = format!("DELETE FROM {} WHERE id = $1", config.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
