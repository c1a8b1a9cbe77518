//! SQLite driver on a single sqlx connection.
//!
//! # Connection Formats
//! - `sqlite:///path/to/database.db` - Absolute file path
//! - `sqlite://./relative/path.db` - Relative file path
//! - `sqlite::memory:` or `:memory:` - In-memory database
//! - `/path/to/database.db`, `data.sqlite`, `data.sqlite3` - Bare file paths
//!
//! SQLite has no authentication, so the resolved user name and password are
//! accepted and ignored. Missing database files are not created.

use super::{ConnectionConfig, DRIVER_VERSION, DatabaseSession, Driver, encode_binary};
use crate::credentials::Credentials;
use crate::error::{JsqlError, redact_database_url};
use crate::metadata::{ServerInfo, Version};
use crate::statement::{QueryOutcome, RowSetBuilder};
use crate::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use std::str::FromStr;

/// Embedded engine: no wire protocol.
const PROTOCOL_VERSION: Version = Version::new(0, 0);

/// Opens SQLite database files and in-memory databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

#[async_trait]
impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn url_formats(&self) -> &'static [&'static str] {
        &[
            "sqlite:///path/to/database.db",
            "sqlite::memory:",
            "/path/to/database.sqlite",
        ]
    }

    fn accepts(&self, address: &str) -> bool {
        validate_sqlite_connection_string(address).is_ok()
    }

    async fn connect(
        &self,
        credentials: &Credentials,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn DatabaseSession>> {
        config.validate()?;
        validate_sqlite_connection_string(credentials.endpoint())?;

        let normalized = normalize_connection_string(credentials.endpoint());
        let mut options = SqliteConnectOptions::from_str(&normalized).map_err(|e| {
            JsqlError::connection_failed("Invalid SQLite connection string", e)
        })?;

        if !config.log_statements {
            options = options.disable_statement_logging();
        }

        let conn = options
            .connect()
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to open SQLite database", e))?;

        let url = redact_database_url(&normalized);
        tracing::info!("Opened SQLite database {}", url);

        Ok(Box::new(SqliteSession {
            conn,
            url,
            user_name: credentials.user().to_string(),
        }))
    }
}

/// An open SQLite connection.
pub struct SqliteSession {
    conn: SqliteConnection,
    url: String,
    user_name: String,
}

impl std::fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseSession for SqliteSession {
    async fn server_info(&mut self) -> Result<ServerInfo> {
        let product_version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to get SQLite version", e))?;

        Ok(ServerInfo {
            product_name: "SQLite".to_string(),
            database_version: Version::parse_leading(&product_version),
            product_version,
            user_name: self.user_name.clone(),
            driver_name: "jsql SQLite driver (sqlx)".to_string(),
            driver_version: DRIVER_VERSION.to_string(),
            url: self.url.clone(),
            protocol_version: PROTOCOL_VERSION,
        })
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to enumerate tables", e))
    }

    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome> {
        let statement = self
            .conn
            .prepare(sql)
            .await
            .map_err(|e| JsqlError::statement_failed("Failed to prepare statement", e))?;

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        if columns.is_empty() {
            let done = statement
                .query()
                .execute(&mut self.conn)
                .await
                .map_err(|e| JsqlError::statement_failed("Failed to execute statement", e))?;
            return Ok(QueryOutcome::update_count(done.rows_affected()));
        }

        let mut builder = RowSetBuilder::new(columns);
        let mut rows = statement.query().fetch(&mut self.conn);
        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| JsqlError::statement_failed("Failed to fetch row", e))?
        {
            builder.push_row(row_cells(&row)?)?;
        }

        Ok(builder.finish())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to close SQLite database", e))
    }
}

/// Validates SQLite connection string format.
///
/// # Errors
/// Returns error if the address is neither a `sqlite:` URL, a known
/// database file extension, nor `:memory:`
pub fn validate_sqlite_connection_string(connection_string: &str) -> Result<()> {
    if connection_string == ":memory:" {
        return Ok(());
    }

    if connection_string.ends_with(".db")
        || connection_string.ends_with(".sqlite")
        || connection_string.ends_with(".sqlite3")
    {
        // A URL with another scheme that happens to end in .db is not ours
        if connection_string.contains("://") && !connection_string.starts_with("sqlite:") {
            return Err(JsqlError::configuration(
                "Connection string must use sqlite:// scheme",
            ));
        }
        return Ok(());
    }

    if connection_string.starts_with("sqlite:") {
        return Ok(());
    }

    Err(JsqlError::configuration(
        "Invalid SQLite connection string format: expected sqlite:// URL, file path, or :memory:",
    ))
}

/// Normalizes an address to sqlx's `sqlite:` URL form.
fn normalize_connection_string(connection_string: &str) -> String {
    if connection_string == ":memory:" {
        return "sqlite::memory:".to_string();
    }

    if connection_string.starts_with("sqlite:") {
        return connection_string.to_string();
    }

    format!("sqlite://{}", connection_string)
}

fn row_cells(row: &SqliteRow) -> Result<Vec<Option<String>>> {
    (0..row.len()).map(|index| cell_text(row, index)).collect()
}

/// Text form of one cell; `None` for SQL NULL.
///
/// SQLite is dynamically typed, so the stored value's class decides. Numbers
/// use SQLite's own text conversion, which keeps `1.0` distinct from `1`.
fn cell_text(row: &SqliteRow, index: usize) -> Result<Option<String>> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| JsqlError::statement_failed("Failed to read column", e))?;
    if raw.is_null() {
        return Ok(None);
    }

    if raw.type_info().name() == "BLOB" {
        return row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| Some(encode_binary(&bytes)))
            .map_err(|e| JsqlError::statement_failed("Failed to read column", e));
    }

    row.try_get_unchecked::<String, _>(index)
        .map(Some)
        .map_err(|e| JsqlError::statement_failed("Failed to read column", e))
}
