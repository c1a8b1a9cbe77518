//! MySQL and MariaDB driver on a single sqlx connection.
//!
//! # Connection Formats
//! - `mysql://host:port/database`
//! - `mariadb://host:port/database` (rewritten to `mysql://`)

use super::{ConnectionConfig, DRIVER_VERSION, DatabaseSession, Driver, encode_binary};
use crate::credentials::Credentials;
use crate::error::{JsqlError, redact_database_url};
use crate::metadata::{ServerInfo, Version};
use crate::statement::{QueryOutcome, RowSetBuilder};
use crate::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Either, Executor, Row, Statement, TypeInfo, ValueRef};
use std::str::FromStr;

/// Client/server handshake protocol version 10.
const PROTOCOL_VERSION: Version = Version::new(10, 0);

/// `ER_UNSUPPORTED_PS`: the statement has no prepared form.
const ER_UNSUPPORTED_PS: u16 = 1295;

/// Connects `mysql://` and `mariadb://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

#[async_trait]
impl Driver for MySqlDriver {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn url_formats(&self) -> &'static [&'static str] {
        &["mysql://host:port/database", "mariadb://host:port/database"]
    }

    fn accepts(&self, address: &str) -> bool {
        address.starts_with("mysql://") || address.starts_with("mariadb://")
    }

    async fn connect(
        &self,
        credentials: &Credentials,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn DatabaseSession>> {
        config.validate()?;

        let address = normalize_connection_string(credentials.endpoint());
        let mut options = MySqlConnectOptions::from_str(&address)
            .map_err(|e| JsqlError::connection_failed("Invalid MySQL connection string", e))?
            .username(credentials.user())
            .password(credentials.password());

        if !config.log_statements {
            options = options.disable_statement_logging();
        }

        let conn = options
            .connect()
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to connect to MySQL", e))?;

        tracing::info!(
            "Connected to MySQL at {}",
            redact_database_url(credentials.endpoint())
        );

        Ok(Box::new(MySqlSession {
            conn,
            url: redact_database_url(credentials.endpoint()),
        }))
    }
}

/// An open MySQL connection.
pub struct MySqlSession {
    conn: MySqlConnection,
    url: String,
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSession")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseSession for MySqlSession {
    async fn server_info(&mut self) -> Result<ServerInfo> {
        let product_version: String = sqlx::query_scalar("SELECT CAST(VERSION() AS CHAR)")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to get server version", e))?;

        let user_name: String = sqlx::query_scalar("SELECT CAST(CURRENT_USER() AS CHAR)")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to get session user", e))?;

        Ok(ServerInfo {
            product_name: product_name(&product_version).to_string(),
            database_version: Version::parse_leading(&product_version),
            product_version,
            user_name,
            driver_name: "jsql MySQL driver (sqlx)".to_string(),
            driver_version: DRIVER_VERSION.to_string(),
            url: self.url.clone(),
            protocol_version: PROTOCOL_VERSION,
        })
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        // Cast to CHAR to avoid VARBINARY type issues in MySQL 8.0+
        sqlx::query_scalar("SELECT CAST(TABLE_NAME AS CHAR) FROM INFORMATION_SCHEMA.TABLES")
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to enumerate tables", e))
    }

    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome> {
        // Prepare only for the column list; rows come back over COM_QUERY,
        // where every value is in its text form
        let columns: Vec<String> = match self.conn.prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect(),
            Err(e) if is_unsupported_by_prepare(&e) => {
                tracing::debug!("Statement has no prepared form, running it directly");
                return self.execute_unprepared(sql).await;
            }
            Err(e) => return Err(JsqlError::statement_failed("Failed to prepare statement", e)),
        };

        if columns.is_empty() {
            let done = (&mut self.conn)
                .execute(sqlx::raw_sql(sql))
                .await
                .map_err(|e| JsqlError::statement_failed("Failed to execute statement", e))?;
            return Ok(QueryOutcome::update_count(done.rows_affected()));
        }

        let mut builder = RowSetBuilder::new(columns);
        let mut rows = sqlx::raw_sql(sql).fetch(&mut self.conn);
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
            .map_err(|e| JsqlError::connection_failed("Failed to close MySQL connection", e))
    }
}

impl MySqlSession {
    /// Runs a statement the server refuses to prepare, such as some
    /// administrative commands. The column list then comes from the first
    /// row, so an empty result reads as an update count.
    async fn execute_unprepared(&mut self, sql: &str) -> Result<QueryOutcome> {
        let mut builder: Option<RowSetBuilder> = None;
        let mut rows_affected = 0;

        let mut results = sqlx::raw_sql(sql).fetch_many(&mut self.conn);
        while let Some(result) = results
            .try_next()
            .await
            .map_err(|e| JsqlError::statement_failed("Failed to execute statement", e))?
        {
            match result {
                Either::Left(done) => rows_affected += done.rows_affected(),
                Either::Right(row) => {
                    let builder = builder.get_or_insert_with(|| {
                        RowSetBuilder::new(
                            row.columns()
                                .iter()
                                .map(|column| column.name().to_string())
                                .collect(),
                        )
                    });
                    builder.push_row(row_cells(&row)?)?;
                }
            }
        }

        Ok(match builder {
            Some(builder) => builder.finish(),
            None => QueryOutcome::update_count(rows_affected),
        })
    }
}

fn is_unsupported_by_prepare(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|e| e.try_downcast_ref::<MySqlDatabaseError>())
        .is_some_and(|e| e.number() == ER_UNSUPPORTED_PS)
}

/// Column types whose values are raw bytes rather than text.
fn is_binary_type(type_name: &str) -> bool {
    matches!(
        type_name,
        "BINARY"
            | "VARBINARY"
            | "TINYBLOB"
            | "BLOB"
            | "MEDIUMBLOB"
            | "LONGBLOB"
            | "BIT"
            | "GEOMETRY"
    )
}

/// MariaDB identifies itself in the version string.
fn product_name(version: &str) -> &'static str {
    if version.contains("MariaDB") {
        "MariaDB"
    } else {
        "MySQL"
    }
}

/// sqlx only understands the `mysql://` scheme.
fn normalize_connection_string(address: &str) -> String {
    match address.strip_prefix("mariadb://") {
        Some(rest) => format!("mysql://{}", rest),
        None => address.to_string(),
    }
}

fn row_cells(row: &MySqlRow) -> Result<Vec<Option<String>>> {
    (0..row.len()).map(|index| cell_text(row, index)).collect()
}

/// Text form of one cell; `None` for SQL NULL.
///
/// Text-protocol values are the server's own output form. Binary columns,
/// and anything that is not valid UTF-8, are base64 encoded.
fn cell_text(row: &MySqlRow, index: usize) -> Result<Option<String>> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| JsqlError::statement_failed("Failed to read column", e))?;
    if raw.is_null() {
        return Ok(None);
    }

    if !is_binary_type(raw.type_info().name())
        && let Ok(text) = row.try_get_unchecked::<String, _>(index)
    {
        return Ok(Some(text));
    }

    row.try_get_unchecked::<Vec<u8>, _>(index)
        .map(|bytes| Some(encode_binary(&bytes)))
        .map_err(|e| JsqlError::statement_failed("Failed to read column", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_name() {
        assert_eq!(product_name("8.0.36"), "MySQL");
        assert_eq!(product_name("10.11.6-MariaDB-1:10.11.6+maria~ubu2204"), "MariaDB");
    }

    #[test]
    fn test_normalize_connection_string() {
        assert_eq!(
            normalize_connection_string("mariadb://u@localhost:3306/db"),
            "mysql://u@localhost:3306/db"
        );
        assert_eq!(
            normalize_connection_string("mysql://localhost/db"),
            "mysql://localhost/db"
        );
    }

    #[test]
    fn test_binary_types() {
        for name in ["VARBINARY", "BLOB", "LONGBLOB", "BIT", "GEOMETRY"] {
            assert!(is_binary_type(name), "{name}");
        }
        for name in ["VARCHAR", "TEXT", "DECIMAL", "DOUBLE", "JSON", "DATETIME"] {
            assert!(!is_binary_type(name), "{name}");
        }
    }

    #[test]
    fn test_only_database_errors_fall_back() {
        assert!(!is_unsupported_by_prepare(&sqlx::Error::RowNotFound));
        assert!(!is_unsupported_by_prepare(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn test_accepts() {
        assert!(MySqlDriver.accepts("mysql://localhost/db"));
        assert!(MySqlDriver.accepts("mariadb://localhost/db"));
        assert!(!MySqlDriver.accepts("postgres://localhost/db"));
    }
}
