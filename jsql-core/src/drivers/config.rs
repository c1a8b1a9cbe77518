//! Transport tuning for driver connections.
//!
//! These settings are driver-specific and not part of the session contract.
//! Credentials are never stored here; they travel in
//! [`Credentials`](crate::credentials::Credentials).

/// Connection tuning applied by drivers that support it.
///
/// # Example
/// ```rust
/// use jsql_core::drivers::ConnectionConfig;
///
/// let config = ConnectionConfig::default().with_statement_logging(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Application name reported to the server (PostgreSQL)
    pub application_name: String,
    /// Whether sqlx logs executed SQL through `tracing`
    pub log_statements: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            application_name: "jsql".to_string(),
            log_statements: false,
        }
    }
}

impl ConnectionConfig {
    /// Validates configuration values.
    ///
    /// # Errors
    /// Returns error if the application name is empty or contains a NUL byte
    pub fn validate(&self) -> crate::Result<()> {
        if self.application_name.is_empty() {
            return Err(crate::error::JsqlError::configuration(
                "application_name cannot be empty",
            ));
        }

        if self.application_name.contains('\0') {
            return Err(crate::error::JsqlError::configuration(
                "application_name cannot contain NUL bytes",
            ));
        }

        Ok(())
    }

    /// Builder method to set the application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Builder method to toggle SQL statement logging.
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.application_name, "jsql");
        assert!(!config.log_statements);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_config_validation() {
        let config = ConnectionConfig::default().with_application_name("");
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_application_name("a\0b");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::default()
            .with_application_name("nightly-check")
            .with_statement_logging(true);
        assert_eq!(config.application_name, "nightly-check");
        assert!(config.log_statements);
    }
}
