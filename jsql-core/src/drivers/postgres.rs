//! PostgreSQL driver on a single sqlx connection.
//!
//! # Connection Formats
//! - `postgres://host:port/database`
//! - `postgresql://host:port/database?sslmode=require`
//!
//! User and password always come from the resolved credentials and override
//! anything embedded in the address.

use super::{ConnectionConfig, DRIVER_VERSION, DatabaseSession, Driver};
use crate::credentials::Credentials;
use crate::error::{JsqlError, redact_database_url};
use crate::metadata::{ServerInfo, Version};
use crate::statement::{QueryOutcome, RowSetBuilder};
use crate::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement, ValueRef};
use std::str::FromStr;

/// Frontend/backend protocol version 3.0.
const PROTOCOL_VERSION: Version = Version::new(3, 0);

/// Connects `postgres://` and `postgresql://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

#[async_trait]
impl Driver for PostgresDriver {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn url_formats(&self) -> &'static [&'static str] {
        &[
            "postgres://host:port/database",
            "postgresql://host:port/database?sslmode=require",
        ]
    }

    fn accepts(&self, address: &str) -> bool {
        address.starts_with("postgres://") || address.starts_with("postgresql://")
    }

    async fn connect(
        &self,
        credentials: &Credentials,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn DatabaseSession>> {
        config.validate()?;

        let mut options = PgConnectOptions::from_str(credentials.endpoint())
            .map_err(|e| JsqlError::connection_failed("Invalid PostgreSQL connection string", e))?
            .username(credentials.user())
            .password(credentials.password())
            .application_name(&config.application_name);

        if !config.log_statements {
            options = options.disable_statement_logging();
        }

        let conn = options
            .connect()
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to connect to PostgreSQL", e))?;

        tracing::info!(
            "Connected to PostgreSQL at {}",
            redact_database_url(credentials.endpoint())
        );

        Ok(Box::new(PostgresSession {
            conn,
            url: redact_database_url(credentials.endpoint()),
        }))
    }
}

/// An open PostgreSQL connection.
pub struct PostgresSession {
    conn: PgConnection,
    url: String,
}

impl std::fmt::Debug for PostgresSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSession")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseSession for PostgresSession {
    async fn server_info(&mut self) -> Result<ServerInfo> {
        let product_version: String = sqlx::query_scalar("SHOW server_version")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to get server version", e))?;

        let user_name: String = sqlx::query_scalar("SELECT current_user::text")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to get session user", e))?;

        Ok(ServerInfo {
            product_name: "PostgreSQL".to_string(),
            database_version: Version::parse_leading(&product_version),
            product_version,
            user_name,
            driver_name: "jsql PostgreSQL driver (sqlx)".to_string(),
            driver_version: DRIVER_VERSION.to_string(),
            url: self.url.clone(),
            protocol_version: PROTOCOL_VERSION,
        })
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT table_name::text FROM information_schema.tables")
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| JsqlError::connection_failed("Failed to enumerate tables", e))
    }

    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome> {
        // Parse only, for the column list; the rows come back through the
        // simple-query protocol, where every value is in its text form
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
            .map_err(|e| JsqlError::connection_failed("Failed to close PostgreSQL connection", e))
    }
}

fn row_cells(row: &PgRow) -> Result<Vec<Option<String>>> {
    (0..row.len()).map(|index| cell_text(row, index)).collect()
}

/// Text form of one cell; `None` for SQL NULL.
///
/// The server sends its own output form for every type, e.g. `{1,2}` for an
/// array or `\x0102` for `bytea`, so nothing here decodes per type.
fn cell_text(row: &PgRow, index: usize) -> Result<Option<String>> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| JsqlError::statement_failed("Failed to read column", e))?;
    if raw.is_null() {
        return Ok(None);
    }

    row.try_get_unchecked::<String, _>(index)
        .map(Some)
        .map_err(|e| JsqlError::statement_failed("Failed to read column", e))
}
