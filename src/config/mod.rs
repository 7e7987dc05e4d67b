//! Daemon configuration: server settings loaded from an optional TOML file
//! with environment variable overrides, plus the content-type registry.

mod content_types;

pub use content_types::{
    builtin_content_types, default_articles_config, default_products_config,
    default_projects_config, ColumnSpec, ContentTypeConfig, ContentTypeRegistry, FieldKind,
    DEFAULT_ORDER, LIFECYCLE_COLUMNS,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration file name under the atelier home directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Server-level settings passed to components at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Maximum connections in the pool.
    pub max_connections: u32,
    /// Session lifetime in hours.
    pub session_ttl_hours: i64,
    /// Cached GET response lifetime in seconds.
    pub cache_ttl_secs: u64,
    /// Directory where uploaded files are stored and served from.
    pub uploads_dir: PathBuf,
    /// Page size used when a list request omits `limit`.
    pub default_page_size: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost:5432/atelier".to_string(),
            max_connections: 10,
            session_ttl_hours: 24,
            cache_ttl_secs: 300,
            uploads_dir: PathBuf::from("uploads"),
            default_page_size: 6,
        }
    }
}

impl ServerConfig {
    /// Validate loaded settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for out-of-range settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_connections".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.session_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "session_ttl_hours".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.default_page_size <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_page_size".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Path of the config file under the atelier home directory.
#[must_use]
pub fn config_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".atelier")
        .join(CONFIG_FILENAME)
}

fn apply_env_overrides(config: &mut ServerConfig) {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.is_empty() {
            config.database_url = url;
        }
    }
    if let Ok(dir) = std::env::var("ATELIER_UPLOADS_DIR") {
        if !dir.is_empty() {
            config.uploads_dir = PathBuf::from(dir);
        }
    }
    if let Some(ttl) = std::env::var("ATELIER_CACHE_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.cache_ttl_secs = ttl;
    }
}

/// Load server configuration.
///
/// Reads `~/.atelier/config.toml` if present, falling back to defaults, then
/// applies environment overrides (`DATABASE_URL`, `ATELIER_UPLOADS_DIR`,
/// `ATELIER_CACHE_TTL_SECS`).
///
/// # Errors
///
/// Returns an error if an existing config file cannot be read or parsed, or
/// if the resulting settings fail validation.
pub fn load_server_config() -> Result<ServerConfig, ConfigError> {
    let path = config_file_path();
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)?
    } else {
        ServerConfig::default()
    };

    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}
