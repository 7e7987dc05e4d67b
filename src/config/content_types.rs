//! Content-type configuration: the whitelists that make the generic record
//! store safe to drive with request data.
//!
//! Every table name, column name, filter column, and order-by clause the
//! store ever interpolates into SQL comes from here. Deployments register
//! their content types at construction time; nothing is discovered from
//! request input.

use serde::{Deserialize, Serialize};

/// Typed kind of a writable column, used to bind JSON payload values to the
/// right PostgreSQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Float,
    Bool,
    TextArray,
    Date,
    Timestamp,
}

impl FieldKind {
    /// SQL column type used when bootstrapping the schema.
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Float => "DOUBLE PRECISION",
            FieldKind::Bool => "BOOLEAN",
            FieldKind::TextArray => "TEXT[]",
            FieldKind::Date => "DATE",
            FieldKind::Timestamp => "TIMESTAMPTZ",
        }
    }
}

/// A writable column in a content table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// Configuration for one content type (one table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTypeConfig {
    /// Table name; doubles as the URL segment (`/api/<table>`).
    pub table: String,
    /// Writable columns (the create/update whitelist) with their kinds.
    pub columns: Vec<ColumnSpec>,
    /// Text columns matched case-insensitively by the `search` parameter,
    /// combined with OR.
    pub search_fields: Vec<String>,
    /// Logical filter name -> column, applied as case-insensitive substring
    /// match and combined with AND.
    pub filters: Vec<(String, String)>,
    /// Column the min/max numeric range filters apply to, if any.
    pub numeric_field: Option<String>,
    /// Permitted `ORDER BY` clauses; anything else falls back to the default.
    pub order_whitelist: Vec<String>,
}

/// Fallback ordering when the requested clause is not whitelisted.
pub const DEFAULT_ORDER: &str = "created_at DESC";

/// Lifecycle columns present on every content table; they are managed by the
/// store and the schema, not by payload whitelists.
pub const LIFECYCLE_COLUMNS: &[&str] = &[
    "id",
    "title",
    "slug",
    "status",
    "tags",
    "published_at",
    "created_at",
    "updated_at",
];

impl ContentTypeConfig {
    /// Look up a writable column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve a requested ordering against the whitelist, falling back to
    /// [`DEFAULT_ORDER`] for anything unrecognized.
    #[must_use]
    pub fn resolve_order(&self, requested: Option<&str>) -> &str {
        match requested {
            Some(r) => self
                .order_whitelist
                .iter()
                .find(|allowed| allowed.as_str() == r)
                .map_or(DEFAULT_ORDER, String::as_str),
            None => DEFAULT_ORDER,
        }
    }

    /// Column used for the tag/author style filter with the given logical
    /// name, if this type declares it.
    #[must_use]
    pub fn filter_column(&self, name: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, col)| col.as_str())
    }
}

/// The set of content types a store instance serves.
#[derive(Debug, Clone, Default)]
pub struct ContentTypeRegistry {
    types: Vec<ContentTypeConfig>,
}

impl ContentTypeRegistry {
    #[must_use]
    pub fn new(types: Vec<ContentTypeConfig>) -> Self {
        Self { types }
    }

    /// Look up a content type by table name. `None` means the table is not
    /// whitelisted.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&ContentTypeConfig> {
        self.types.iter().find(|t| t.table == table)
    }

    /// All registered content types, in registration order.
    #[must_use]
    pub fn types(&self) -> &[ContentTypeConfig] {
        &self.types
    }
}

fn shared_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("title", FieldKind::Text),
        ColumnSpec::new("slug", FieldKind::Text),
        ColumnSpec::new("status", FieldKind::Text),
        ColumnSpec::new("tags", FieldKind::TextArray),
        ColumnSpec::new("date", FieldKind::Date),
        ColumnSpec::new("image_url", FieldKind::Text),
    ]
}

fn base_order_whitelist() -> Vec<String> {
    [
        "created_at DESC",
        "created_at ASC",
        "updated_at DESC",
        "updated_at ASC",
        "title ASC",
        "title DESC",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Build the default projects config.
#[must_use]
pub fn default_projects_config() -> ContentTypeConfig {
    let mut columns = shared_columns();
    columns.push(ColumnSpec::new("excerpt", FieldKind::Text));
    columns.push(ColumnSpec::new("description", FieldKind::Text));

    ContentTypeConfig {
        table: "projects".to_string(),
        columns,
        search_fields: vec![
            "title".to_string(),
            "excerpt".to_string(),
            "description".to_string(),
        ],
        filters: vec![("tag".to_string(), "tags".to_string())],
        numeric_field: None,
        order_whitelist: base_order_whitelist(),
    }
}

/// Build the default articles config.
#[must_use]
pub fn default_articles_config() -> ContentTypeConfig {
    let mut columns = shared_columns();
    columns.push(ColumnSpec::new("author", FieldKind::Text));
    columns.push(ColumnSpec::new("content", FieldKind::Text));

    ContentTypeConfig {
        table: "articles".to_string(),
        columns,
        search_fields: vec![
            "title".to_string(),
            "author".to_string(),
            "content".to_string(),
        ],
        filters: vec![("author".to_string(), "author".to_string())],
        numeric_field: None,
        order_whitelist: base_order_whitelist(),
    }
}

/// Build the default products config.
#[must_use]
pub fn default_products_config() -> ContentTypeConfig {
    let mut columns = shared_columns();
    columns.push(ColumnSpec::new("price", FieldKind::Float));
    columns.push(ColumnSpec::new("description", FieldKind::Text));

    let mut order_whitelist = base_order_whitelist();
    order_whitelist.push("price ASC".to_string());
    order_whitelist.push("price DESC".to_string());

    ContentTypeConfig {
        table: "products".to_string(),
        columns,
        search_fields: vec!["title".to_string(), "description".to_string()],
        filters: vec![("tag".to_string(), "tags".to_string())],
        numeric_field: Some("price".to_string()),
        order_whitelist,
    }
}

/// Registry with the three built-in content types.
#[must_use]
pub fn builtin_content_types() -> ContentTypeRegistry {
    ContentTypeRegistry::new(vec![
        default_projects_config(),
        default_articles_config(),
        default_products_config(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_has_three_types() {
        let registry = builtin_content_types();
        assert_eq!(registry.types().len(), 3);
        assert!(registry.get("projects").is_some());
        assert!(registry.get("articles").is_some());
        assert!(registry.get("products").is_some());
    }

    #[test]
    fn test_unknown_table_is_not_whitelisted() {
        let registry = builtin_content_types();
        assert!(registry.get("admin_users").is_none());
        assert!(registry.get("products; DROP TABLE products").is_none());
    }

    #[test]
    fn test_products_declare_price_column_and_range() {
        let products = default_products_config();
        let price = products.column("price").expect("price column");
        assert_eq!(price.kind, FieldKind::Float);
        assert_eq!(products.numeric_field.as_deref(), Some("price"));
    }

    #[test]
    fn test_projects_have_no_numeric_range() {
        assert!(default_projects_config().numeric_field.is_none());
    }

    #[test]
    fn test_resolve_order_accepts_whitelisted() {
        let products = default_products_config();
        assert_eq!(products.resolve_order(Some("price ASC")), "price ASC");
        assert_eq!(products.resolve_order(Some("title DESC")), "title DESC");
    }

    #[test]
    fn test_resolve_order_falls_back_silently() {
        let projects = default_projects_config();
        assert_eq!(projects.resolve_order(Some("price ASC")), DEFAULT_ORDER);
        assert_eq!(
            projects.resolve_order(Some("created_at; DROP TABLE x")),
            DEFAULT_ORDER
        );
        assert_eq!(projects.resolve_order(None), DEFAULT_ORDER);
    }

    #[test]
    fn test_filter_column_lookup() {
        let projects = default_projects_config();
        assert_eq!(projects.filter_column("tag"), Some("tags"));
        assert_eq!(projects.filter_column("author"), None);

        let articles = default_articles_config();
        assert_eq!(articles.filter_column("author"), Some("author"));
    }

    #[test]
    fn test_column_whitelist_excludes_server_managed_fields() {
        let projects = default_projects_config();
        assert!(projects.column("id").is_none());
        assert!(projects.column("created_at").is_none());
        assert!(projects.column("published_at").is_none());
        // slug and status are writable
        assert!(projects.column("slug").is_some());
        assert!(projects.column("status").is_some());
    }

    #[test]
    fn test_field_kind_sql_types() {
        assert_eq!(FieldKind::Text.sql_type(), "TEXT");
        assert_eq!(FieldKind::Float.sql_type(), "DOUBLE PRECISION");
        assert_eq!(FieldKind::TextArray.sql_type(), "TEXT[]");
        assert_eq!(FieldKind::Date.sql_type(), "DATE");
    }
}
