use thiserror::Error;

/// Errors from the generic record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested table is not in the content-type whitelist.
    #[error("table not allowed: {0}")]
    InvalidTable(String),

    /// A write payload contained no whitelisted fields after filtering.
    #[error("no valid fields to save")]
    NoValidFields,

    /// A payload value could not be converted to the column's type.
    #[error("invalid value for {column}: expected {expected}")]
    InvalidValue {
        column: String,
        expected: &'static str,
    },

    /// Query execution failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// True when this error should be reported as a client mistake rather
    /// than a server fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidTable(_)
                | StoreError::NoValidFields
                | StoreError::InvalidValue { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(StoreError::InvalidTable("users".to_string()).is_client_error());
        assert!(StoreError::NoValidFields.is_client_error());
        assert!(StoreError::InvalidValue {
            column: "price".to_string(),
            expected: "number",
        }
        .is_client_error());
        assert!(!StoreError::Database(sqlx::Error::PoolClosed).is_client_error());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::InvalidTable("admin_users".to_string());
        assert_eq!(err.to_string(), "table not allowed: admin_users");
        assert_eq!(
            StoreError::NoValidFields.to_string(),
            "no valid fields to save"
        );
    }
}
