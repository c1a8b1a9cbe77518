//! Connectivity layer: driver registry and session trait.
//!
//! The session lifecycle and rendering code only see [`DatabaseSession`] and
//! [`DriverRegistry`]. Which drivers exist is decided by whoever builds the
//! registry; [`DriverRegistry::with_default_drivers`] registers the ones
//! compiled in through Cargo features.
//!
//! # Module Structure
//! - `config`: Connection tuning (`ConnectionConfig`)
//! - Driver modules (postgres, mysql, sqlite), each behind its feature

use crate::credentials::Credentials;
use crate::error::JsqlError;
use crate::metadata::ServerInfo;
use crate::statement::QueryOutcome;
use crate::Result;
use async_trait::async_trait;

pub mod config;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgresql")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::ConnectionConfig;

/// One live, authenticated connection.
///
/// A value of this type is always fully open; [`close`](Self::close)
/// consumes it, so a closed session cannot be used again.
#[async_trait]
pub trait DatabaseSession: Send {
    /// Reads server, driver and session facts.
    ///
    /// # Errors
    /// Returns a connection error if any metadata query fails
    async fn server_info(&mut self) -> Result<ServerInfo>;

    /// Names of every table-like object visible to the session.
    ///
    /// No schema or type restriction; unsorted; duplicates preserved.
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// Executes one statement verbatim.
    ///
    /// # Errors
    /// Returns a statement error if preparation, execution or fetching fails,
    /// or a null-cell error if a result cell is NULL
    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome>;

    /// Closes the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A connector for one family of endpoint addresses.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Human-readable database name, e.g. "PostgreSQL".
    fn name(&self) -> &'static str;

    /// Example address formats, for help output.
    fn url_formats(&self) -> &'static [&'static str];

    /// Whether this driver handles `address`.
    fn accepts(&self, address: &str) -> bool;

    /// Opens a session for the credentials' endpoint.
    ///
    /// # Errors
    /// Returns a connection error if the address is malformed or the
    /// connection cannot be established
    async fn connect(
        &self,
        credentials: &Credentials,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn DatabaseSession>>;
}

/// Ordered set of drivers; the first one that accepts an address wins.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<Box<dyn Driver>>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.drivers.iter().map(|driver| driver.name()))
            .finish()
    }
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every driver compiled into this build.
    pub fn with_default_drivers() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "postgresql")]
        registry.register(postgres::PostgresDriver);
        #[cfg(feature = "mysql")]
        registry.register(mysql::MySqlDriver);
        #[cfg(feature = "sqlite")]
        registry.register(sqlite::SqliteDriver);

        registry
    }

    /// Appends a driver. Earlier registrations take precedence.
    pub fn register(&mut self, driver: impl Driver + 'static) -> &mut Self {
        self.drivers.push(Box::new(driver));
        self
    }

    /// Registered drivers in lookup order.
    pub fn drivers(&self) -> impl Iterator<Item = &(dyn Driver + 'static)> {
        self.drivers.iter().map(AsRef::as_ref)
    }

    /// The first driver that accepts `address`.
    pub fn find(&self, address: &str) -> Option<&dyn Driver> {
        self.drivers().find(|driver| driver.accepts(address))
    }

    /// Opens a session through the first matching driver.
    ///
    /// # Errors
    /// Returns [`JsqlError::NoDriver`] when no driver accepts the address,
    /// otherwise whatever the driver's `connect` returns
    pub async fn connect(
        &self,
        credentials: &Credentials,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn DatabaseSession>> {
        let driver = self
            .find(credentials.endpoint())
            .ok_or_else(|| JsqlError::no_driver(credentials.endpoint()))?;
        tracing::debug!("Using {} driver", driver.name());
        driver.connect(credentials, config).await
    }
}

/// Renders binary cell values.
#[cfg(any(feature = "mysql", feature = "sqlite"))]
pub(crate) fn encode_binary(bytes: &[u8]) -> String {
    use base64::Engine;
    format!(
        "base64:{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Version reported by every built-in driver.
#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub(crate) const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");
