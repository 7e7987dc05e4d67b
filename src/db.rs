//! Database pool setup and schema bootstrap.
//!
//! The content tables are derived from the content-type registry so the
//! schema and the store whitelists cannot drift apart.

use crate::config::{ContentTypeConfig, ContentTypeRegistry};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

/// Connect to PostgreSQL with a bounded pool.
///
/// # Errors
///
/// Returns the underlying `sqlx` error if the pool cannot be created.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Render the `CREATE TABLE` statement for one content type.
///
/// Lifecycle columns (id, title, slug, status, tags, timestamps) are fixed;
/// the remaining columns come from the type's whitelist with their declared
/// kinds.
#[must_use]
pub fn content_table_ddl(config: &ContentTypeConfig) -> String {
    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n\
         \x20   id BIGSERIAL PRIMARY KEY,\n\
         \x20   title VARCHAR(255) NOT NULL,\n\
         \x20   slug TEXT UNIQUE,\n\
         \x20   status TEXT NOT NULL DEFAULT 'draft',\n\
         \x20   tags TEXT[],\n\
         \x20   published_at TIMESTAMPTZ,\n\
         \x20   created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),\n\
         \x20   updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()",
        config.table
    );

    for column in &config.columns {
        if crate::config::LIFECYCLE_COLUMNS.contains(&column.name.as_str()) {
            continue;
        }
        ddl.push_str(&format!(
            ",\n    {} {}",
            column.name,
            column.kind.sql_type()
        ));
    }

    ddl.push_str("\n)");
    ddl
}

const ADMIN_USERS_DDL: &str = "CREATE TABLE IF NOT EXISTS admin_users (\n\
    \x20   id BIGSERIAL PRIMARY KEY,\n\
    \x20   username VARCHAR(255) NOT NULL UNIQUE,\n\
    \x20   password_hash TEXT NOT NULL,\n\
    \x20   is_active BOOLEAN NOT NULL DEFAULT TRUE,\n\
    \x20   created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\n\
)";

const ADMIN_SESSIONS_DDL: &str = "CREATE TABLE IF NOT EXISTS admin_sessions (\n\
    \x20   id BIGSERIAL PRIMARY KEY,\n\
    \x20   user_id BIGINT NOT NULL REFERENCES admin_users(id) ON DELETE CASCADE,\n\
    \x20   token TEXT NOT NULL UNIQUE,\n\
    \x20   created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),\n\
    \x20   expires_at TIMESTAMPTZ NOT NULL\n\
)";

/// Create all tables and indexes if they do not exist.
///
/// # Errors
///
/// Returns the underlying `sqlx` error on DDL failure.
pub async fn ensure_schema(
    pool: &PgPool,
    registry: &ContentTypeRegistry,
) -> Result<(), sqlx::Error> {
    for config in registry.types() {
        sqlx::query(&content_table_ddl(config)).execute(pool).await?;
        let index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_status ON {table} (status)",
            table = config.table
        );
        sqlx::query(&index).execute(pool).await?;
    }

    sqlx::query(ADMIN_USERS_DDL).execute(pool).await?;
    sqlx::query(ADMIN_SESSIONS_DDL).execute(pool).await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_admin_sessions_token ON admin_sessions (token)",
    )
    .execute(pool)
    .await?;

    info!("database schema ready");
    Ok(())
}

/// Create the initial admin user from `ADMIN_USERNAME` / `ADMIN_PASSWORD`
/// when the users table is empty.
///
/// Does nothing when the variables are unset or an admin already exists.
///
/// # Errors
///
/// Returns an error if the query or the password hash fails.
pub async fn seed_admin_from_env(pool: &PgPool) -> Result<(), crate::auth::AuthError> {
    let (Ok(username), Ok(password)) = (
        std::env::var("ADMIN_USERNAME"),
        std::env::var("ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };
    if username.is_empty() || password.is_empty() {
        return Ok(());
    }

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let hash = crate::auth::hash_password(password).await?;
    sqlx::query("INSERT INTO admin_users (username, password_hash) VALUES ($1, $2)")
        .bind(&username)
        .bind(&hash)
        .execute(pool)
        .await?;

    warn!(%username, "seeded initial admin user from environment");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_content_types, default_products_config};

    #[test]
    fn test_content_table_ddl_has_lifecycle_columns() {
        let ddl = content_table_ddl(&default_products_config());
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS products"));
        assert!(ddl.contains("id BIGSERIAL PRIMARY KEY"));
        assert!(ddl.contains("slug TEXT UNIQUE"));
        assert!(ddl.contains("status TEXT NOT NULL DEFAULT 'draft'"));
        assert!(ddl.contains("published_at TIMESTAMPTZ"));
    }

    #[test]
    fn test_content_table_ddl_includes_typed_extras() {
        let ddl = content_table_ddl(&default_products_config());
        assert!(ddl.contains("price DOUBLE PRECISION"));
        assert!(ddl.contains("description TEXT"));
        assert!(ddl.contains("date DATE"));
    }

    #[test]
    fn test_content_table_ddl_does_not_duplicate_lifecycle_columns() {
        let ddl = content_table_ddl(&default_products_config());
        // title/slug/status/tags appear once (from the fixed part only)
        assert_eq!(ddl.matches("slug TEXT").count(), 1);
        assert_eq!(ddl.matches("tags TEXT[]").count(), 1);
    }

    #[test]
    fn test_all_builtin_types_render_ddl() {
        for config in builtin_content_types().types() {
            let ddl = content_table_ddl(config);
            assert!(ddl.contains(&config.table));
            assert!(ddl.ends_with(')'));
        }
    }
}
