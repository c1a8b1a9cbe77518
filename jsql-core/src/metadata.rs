//! Server, driver and session facts reported right after connecting.

use crate::drivers::DatabaseSession;
use crate::report::Report;
use crate::Result;
use std::io::Write;

/// A `major.minor` version pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
}

impl Version {
    /// Creates a version from its components.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Extracts the first `major.minor` pair from a server version string.
    ///
    /// Handles strings such as `"16.2 (Debian 16.2-1.pgdg120+2)"`,
    /// `"PostgreSQL 14.5 on x86_64-pc-linux-gnu"`, `"8.0.36"` and
    /// `"10.11.6-MariaDB-1"`. Missing components are zero.
    pub fn parse_leading(version_string: &str) -> Self {
        let Some(token) = version_string
            .split_whitespace()
            .find(|part| part.chars().next().is_some_and(|c| c.is_ascii_digit()))
        else {
            return Self::default();
        };

        let mut components = token.split('.').map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().unwrap_or(0)
        });

        Self {
            major: components.next().unwrap_or(0),
            minor: components.next().unwrap_or(0),
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Snapshot of server, driver and session facts. Read once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Database product name (e.g. "PostgreSQL")
    pub product_name: String,
    /// Full product version string as reported by the server
    pub product_version: String,
    /// Server major/minor version
    pub database_version: Version,
    /// User name the session is authenticated as
    pub user_name: String,
    /// Name of the driver serving the session
    pub driver_name: String,
    /// Version of the driver serving the session
    pub driver_version: String,
    /// Endpoint address, password redacted
    pub url: String,
    /// Wire protocol major/minor version
    pub protocol_version: Version,
}

impl ServerInfo {
    /// The eight report lines, label column aligned on the colon.
    pub fn lines(&self) -> [String; 8] {
        [
            format!("Product name    : {}", self.product_name),
            format!("Product version : {}", self.product_version),
            format!("Database version: {}", self.database_version),
            format!("Driver name     : {}", self.driver_name),
            format!("Driver version  : {}", self.driver_version),
            format!("JDBC URL        : {}", self.url),
            format!("JDBC version    : {}", self.protocol_version),
            format!("User name       : {}", self.user_name),
        ]
    }
}

/// Reads the session's [`ServerInfo`] and writes its lines to `out`.
///
/// # Errors
/// Metadata failures surface as connection errors from the driver.
pub async fn report<W: Write>(
    session: &mut dyn DatabaseSession,
    out: &mut Report<W>,
) -> Result<ServerInfo> {
    let info = session.server_info().await?;
    tracing::debug!("Server reports {} {}", info.product_name, info.product_version);
    out.lines(info.lines())?;
    Ok(info)
}
