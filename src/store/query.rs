//! Typed SQL construction for list queries.
//!
//! Request data never reaches SQL text. Identifiers (table, columns, order)
//! come from the content-type config; every value travels as a typed bind
//! with a numbered placeholder. The count statement is built from the same
//! predicates as the select so totals always match the filtered rows.

use crate::config::{ContentTypeConfig, FieldKind};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

/// A value bound to a numbered placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    TextArray(Vec<String>),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    /// SQL NULL, tagged with the column kind so the driver sends the right
    /// type oid.
    Null(FieldKind),
}

/// Bind a list of values onto a query in order.
#[must_use]
pub fn bind_all<'q>(
    query: Query<'q, Postgres, PgArguments>,
    binds: &[BindValue],
) -> Query<'q, Postgres, PgArguments> {
    binds.iter().cloned().fold(query, |q, value| match value {
        BindValue::Text(v) => q.bind(v),
        BindValue::Float(v) => q.bind(v),
        BindValue::Int(v) => q.bind(v),
        BindValue::Bool(v) => q.bind(v),
        BindValue::TextArray(v) => q.bind(v),
        BindValue::Date(v) => q.bind(v),
        BindValue::Timestamp(v) => q.bind(v),
        BindValue::Null(kind) => match kind {
            FieldKind::Text => q.bind(None::<String>),
            FieldKind::Float => q.bind(None::<f64>),
            FieldKind::Bool => q.bind(None::<bool>),
            FieldKind::TextArray => q.bind(None::<Vec<String>>),
            FieldKind::Date => q.bind(None::<NaiveDate>),
            FieldKind::Timestamp => q.bind(None::<DateTime<Utc>>),
        },
    })
}

/// WHERE clauses under construction, with their bind values.
#[derive(Debug, Default)]
pub struct PredicateList {
    clauses: Vec<String>,
    binds: Vec<BindValue>,
}

impl PredicateList {
    /// Register a bind value and return its placeholder (`$1`, `$2`, ...).
    pub fn bind(&mut self, value: BindValue) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    /// Add a finished clause.
    pub fn push(&mut self, clause: String) {
        self.clauses.push(clause);
    }

    /// Render `" WHERE a AND b"`, or an empty string without clauses.
    #[must_use]
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    #[must_use]
    pub fn into_binds(self) -> Vec<BindValue> {
        self.binds
    }

    #[must_use]
    pub fn bind_count(&self) -> usize {
        self.binds.len()
    }
}

/// Parameters for a list request.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub offset: i64,
    pub limit: i64,
    /// Case-insensitive substring matched against the type's search fields.
    pub search: Option<String>,
    /// Logical filter name and value pairs, matched against declared filters.
    pub filters: Vec<(String, String)>,
    /// Requested ordering, resolved against the whitelist.
    pub order_by: Option<String>,
    /// Lower bound on the type's numeric field.
    pub min_numeric: Option<f64>,
    /// Upper bound on the type's numeric field.
    pub max_numeric: Option<f64>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 6,
            search: None,
            filters: Vec::new(),
            order_by: None,
            min_numeric: None,
            max_numeric: None,
        }
    }
}

/// The select and count statements for one list request.
#[derive(Debug)]
pub struct ListStatements {
    pub select_sql: String,
    pub select_binds: Vec<BindValue>,
    pub count_sql: String,
    pub count_binds: Vec<BindValue>,
}

fn search_clause(predicates: &mut PredicateList, config: &ContentTypeConfig, term: &str) {
    if config.search_fields.is_empty() {
        return;
    }
    // All search fields share one placeholder.
    let placeholder = predicates.bind(BindValue::Text(format!("%{term}%")));
    let parts: Vec<String> = config
        .search_fields
        .iter()
        .map(|field| format!("{field} ILIKE {placeholder}"))
        .collect();
    predicates.push(format!("({})", parts.join(" OR ")));
}

fn filter_clause(predicates: &mut PredicateList, config: &ContentTypeConfig, name: &str, value: &str) {
    let Some(column) = config.filter_column(name) else {
        return;
    };
    let placeholder = predicates.bind(BindValue::Text(format!("%{value}%")));
    let is_array = config
        .column(column)
        .is_some_and(|c| c.kind == FieldKind::TextArray);
    if is_array {
        predicates.push(format!(
            "array_to_string({column}, ' ') ILIKE {placeholder}"
        ));
    } else {
        predicates.push(format!("{column} ILIKE {placeholder}"));
    }
}

/// Build the select and count statements for a list request.
///
/// Unknown filters and non-whitelisted orderings are ignored rather than
/// rejected; range bounds only apply when the type declares a numeric field.
#[must_use]
pub fn build_list_query(config: &ContentTypeConfig, query: &ListQuery) -> ListStatements {
    let mut predicates = PredicateList::default();

    if let Some(term) = query.search.as_deref().filter(|t| !t.is_empty()) {
        search_clause(&mut predicates, config, term);
    }

    for (name, value) in &query.filters {
        if !value.is_empty() {
            filter_clause(&mut predicates, config, name, value);
        }
    }

    if let Some(numeric) = config.numeric_field.as_deref() {
        if let Some(min) = query.min_numeric {
            let placeholder = predicates.bind(BindValue::Float(min));
            predicates.push(format!("{numeric} >= {placeholder}"));
        }
        if let Some(max) = query.max_numeric {
            let placeholder = predicates.bind(BindValue::Float(max));
            predicates.push(format!("{numeric} <= {placeholder}"));
        }
    }

    let where_sql = predicates.where_sql();
    let order = config.resolve_order(query.order_by.as_deref());

    let count_sql = format!("SELECT COUNT(*) FROM {}{}", config.table, where_sql);
    let count_binds = predicates.bind_count();

    let limit_placeholder = count_binds.saturating_add(1);
    let offset_placeholder = count_binds.saturating_add(2);
    let select_sql = format!(
        "SELECT * FROM {}{} ORDER BY {} LIMIT ${} OFFSET ${}",
        config.table, where_sql, order, limit_placeholder, offset_placeholder
    );

    let shared = predicates.into_binds();
    let mut select_binds = shared.clone();
    select_binds.push(BindValue::Int(query.limit));
    select_binds.push(BindValue::Int(query.offset));

    ListStatements {
        select_sql,
        select_binds,
        count_sql,
        count_binds: shared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_articles_config, default_products_config, default_projects_config};

    #[test]
    fn test_plain_list_query() {
        let stmts = build_list_query(&default_projects_config(), &ListQuery::default());
        assert_eq!(
            stmts.select_sql,
            "SELECT * FROM projects ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        assert_eq!(stmts.count_sql, "SELECT COUNT(*) FROM projects");
        assert_eq!(
            stmts.select_binds,
            vec![BindValue::Int(6), BindValue::Int(0)]
        );
        assert!(stmts.count_binds.is_empty());
    }

    #[test]
    fn test_search_shares_one_placeholder() {
        let query = ListQuery {
            search: Some("chair".to_string()),
            ..ListQuery::default()
        };
        let stmts = build_list_query(&default_products_config(), &query);
        assert!(stmts
            .select_sql
            .contains("(title ILIKE $1 OR description ILIKE $1)"));
        assert_eq!(
            stmts.count_binds,
            vec![BindValue::Text("%chair%".to_string())]
        );
    }

    #[test]
    fn test_tag_filter_uses_array_match() {
        let query = ListQuery {
            filters: vec![("tag".to_string(), "wood".to_string())],
            ..ListQuery::default()
        };
        let stmts = build_list_query(&default_products_config(), &query);
        assert!(stmts
            .select_sql
            .contains("array_to_string(tags, ' ') ILIKE $1"));
    }

    #[test]
    fn test_author_filter_uses_plain_match() {
        let query = ListQuery {
            filters: vec![("author".to_string(), "ada".to_string())],
            ..ListQuery::default()
        };
        let stmts = build_list_query(&default_articles_config(), &query);
        assert!(stmts.select_sql.contains("author ILIKE $1"));
    }

    #[test]
    fn test_unknown_filter_is_ignored() {
        let query = ListQuery {
            filters: vec![("author".to_string(), "ada".to_string())],
            ..ListQuery::default()
        };
        // projects declare no author filter
        let stmts = build_list_query(&default_projects_config(), &query);
        assert_eq!(stmts.count_sql, "SELECT COUNT(*) FROM projects");
        assert!(stmts.count_binds.is_empty());
    }

    #[test]
    fn test_price_range_on_products() {
        let query = ListQuery {
            min_numeric: Some(10.0),
            max_numeric: Some(99.5),
            ..ListQuery::default()
        };
        let stmts = build_list_query(&default_products_config(), &query);
        assert!(stmts.select_sql.contains("price >= $1"));
        assert!(stmts.select_sql.contains("price <= $2"));
        assert_eq!(
            stmts.count_binds,
            vec![BindValue::Float(10.0), BindValue::Float(99.5)]
        );
    }

    #[test]
    fn test_price_range_ignored_without_numeric_field() {
        let query = ListQuery {
            min_numeric: Some(10.0),
            ..ListQuery::default()
        };
        let stmts = build_list_query(&default_articles_config(), &query);
        assert_eq!(stmts.count_sql, "SELECT COUNT(*) FROM articles");
    }

    #[test]
    fn test_combined_predicates_and_numbering() {
        let query = ListQuery {
            offset: 12,
            limit: 6,
            search: Some("oak".to_string()),
            filters: vec![("tag".to_string(), "furniture".to_string())],
            order_by: Some("price ASC".to_string()),
            min_numeric: Some(5.0),
            max_numeric: None,
        };
        let stmts = build_list_query(&default_products_config(), &query);
        assert_eq!(
            stmts.select_sql,
            "SELECT * FROM products WHERE (title ILIKE $1 OR description ILIKE $1) \
             AND array_to_string(tags, ' ') ILIKE $2 AND price >= $3 \
             ORDER BY price ASC LIMIT $4 OFFSET $5"
        );
        assert_eq!(
            stmts.count_sql,
            "SELECT COUNT(*) FROM products WHERE (title ILIKE $1 OR description ILIKE $1) \
             AND array_to_string(tags, ' ') ILIKE $2 AND price >= $3"
        );
        assert_eq!(stmts.select_binds.len(), 5);
        assert_eq!(stmts.count_binds.len(), 3);
    }

    #[test]
    fn test_hostile_order_by_falls_back() {
        let query = ListQuery {
            order_by: Some("price; DROP TABLE products".to_string()),
            ..ListQuery::default()
        };
        let stmts = build_list_query(&default_products_config(), &query);
        assert!(stmts.select_sql.contains("ORDER BY created_at DESC"));
        assert!(!stmts.select_sql.contains("DROP"));
    }

    #[test]
    fn test_empty_search_and_filter_values_skipped() {
        let query = ListQuery {
            search: Some(String::new()),
            filters: vec![("tag".to_string(), String::new())],
            ..ListQuery::default()
        };
        let stmts = build_list_query(&default_products_config(), &query);
        assert_eq!(stmts.count_sql, "SELECT COUNT(*) FROM products");
    }
}
