//! Credential resolution with automatic memory zeroing.
//!
//! Each field comes from the explicit option value when it is present and
//! non-empty, otherwise from its environment variable. Missing fields are
//! reported in a fixed order: endpoint, then user, then password.
//!
//! # Security
//! - User name and password live in `Zeroizing<String>` containers
//! - The password is never exposed in debug output or logs

use crate::{Result, error::JsqlError};
use zeroize::Zeroizing;

/// Environment variable holding the default endpoint address.
pub const ENDPOINT_ENV: &str = "JSQL_JDBC_URL";
/// Environment variable holding the default user name.
pub const USER_ENV: &str = "JSQL_USER_NAME";
/// Environment variable holding the default password.
pub const PASSWORD_ENV: &str = "JSQL_USER_PASSWORD";

/// Resolved connection credentials. Immutable once constructed.
#[derive(Clone)]
pub struct Credentials {
    endpoint: String,
    user: Zeroizing<String>,
    password: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &crate::error::redact_database_url(&self.endpoint))
            .field("user", &self.user.as_str())
            // password intentionally omitted
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Builds credentials from already-resolved values.
    ///
    /// Prefer [`resolve`] when values may be missing.
    pub fn new(endpoint: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user: Zeroizing::new(user.into()),
            password: Zeroizing::new(password.into()),
        }
    }

    /// The endpoint address (connection string) as given.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The user name.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The password. Never log this.
    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Merges explicit option values with environment defaults.
///
/// `env` is consulted by variable name only for fields whose explicit value
/// is absent or empty. Pure: no process state is read except through `env`.
///
/// # Errors
/// Returns the error for the first unresolved field, checked in the order
/// endpoint, user, password.
///
/// # Example
/// ```rust
/// use jsql_core::credentials::resolve;
///
/// let creds = resolve(Some("sqlite::memory:"), Some("admin"), None, |name| {
///     (name == "JSQL_USER_PASSWORD").then(|| "secret".to_string())
/// })
/// .unwrap();
/// assert_eq!(creds.user(), "admin");
/// assert_eq!(creds.password(), "secret");
/// ```
pub fn resolve<F>(
    explicit_endpoint: Option<&str>,
    explicit_user: Option<&str>,
    explicit_password: Option<&str>,
    env: F,
) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let pick = |explicit: Option<&str>, variable: &str| -> Option<String> {
        explicit
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| env(variable).filter(|value| !value.is_empty()))
    };

    let endpoint = pick(explicit_endpoint, ENDPOINT_ENV).ok_or(JsqlError::MissingEndpoint)?;
    let user = pick(explicit_user, USER_ENV).ok_or(JsqlError::MissingUser)?;
    let password = Zeroizing::new(
        pick(explicit_password, PASSWORD_ENV).ok_or(JsqlError::MissingPassword)?,
    );

    Ok(Credentials {
        endpoint,
        user: Zeroizing::new(user),
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_explicit_values_win() {
        let env = env_of(&[
            (ENDPOINT_ENV, "postgres://env/db"),
            (USER_ENV, "env_user"),
            (PASSWORD_ENV, "env_pass"),
        ]);
        let creds = resolve(Some("sqlite::memory:"), Some("cli_user"), Some("cli_pass"), env).unwrap();
        assert_eq!(creds.endpoint(), "sqlite::memory:");
        assert_eq!(creds.user(), "cli_user");
        assert_eq!(creds.password(), "cli_pass");
    }

    #[test]
    fn test_environment_fallback() {
        let env = env_of(&[
            (ENDPOINT_ENV, "postgres://env/db"),
            (USER_ENV, "env_user"),
            (PASSWORD_ENV, "env_pass"),
        ]);
        let creds = resolve(None, None, None, env).unwrap();
        assert_eq!(creds.endpoint(), "postgres://env/db");
        assert_eq!(creds.user(), "env_user");
        assert_eq!(creds.password(), "env_pass");
    }

    #[test]
    fn test_empty_explicit_value_falls_back() {
        let env = env_of(&[(USER_ENV, "env_user")]);
        let creds = resolve(Some("sqlite::memory:"), Some(""), Some("p"), env).unwrap();
        assert_eq!(creds.user(), "env_user");
    }

    #[test]
    fn test_empty_environment_value_is_missing() {
        let env = env_of(&[(PASSWORD_ENV, "")]);
        let err = resolve(Some("sqlite::memory:"), Some("u"), None, env).unwrap_err();
        assert!(matches!(err, JsqlError::MissingPassword));
    }

    #[test]
    fn test_missing_exactly_one_field() {
        let none = env_of(&[]);
        assert!(matches!(
            resolve(None, Some("u"), Some("p"), &none),
            Err(JsqlError::MissingEndpoint)
        ));
        assert!(matches!(
            resolve(Some("e"), None, Some("p"), &none),
            Err(JsqlError::MissingUser)
        ));
        assert!(matches!(
            resolve(Some("e"), Some("u"), None, &none),
            Err(JsqlError::MissingPassword)
        ));
    }

    #[test]
    fn test_first_missing_field_wins() {
        let none = env_of(&[]);
        assert!(matches!(
            resolve(None, None, None, &none),
            Err(JsqlError::MissingEndpoint)
        ));
        assert!(matches!(
            resolve(Some("e"), None, None, &none),
            Err(JsqlError::MissingUser)
        ));
        assert!(matches!(
            resolve(None, Some("u"), None, &none),
            Err(JsqlError::MissingEndpoint)
        ));
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = Credentials::new("postgres://h/db", "admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
