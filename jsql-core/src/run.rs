//! One invocation end to end: connect, report, list, execute, close.

use crate::credentials::Credentials;
use crate::drivers::DatabaseSession;
use crate::report::Report;
use crate::session::SessionManager;
use crate::{Result, metadata, statement, tables};
use std::io::Write;

/// Line printed once the session is open.
pub const CONNECTED: &str = "Connection established successfully.";
/// Line printed after a successful run closed its session.
pub const CLOSED: &str = "Connection closed.";

/// What to do once connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Print the table section
    pub print_tables: bool,
    /// Regular expression the table names must contain a match for
    pub table_pattern: Option<String>,
    /// Statement to execute; empty means none
    pub sql: Option<String>,
}

impl RunOptions {
    /// The statement to execute, if any non-empty one was given.
    pub fn statement(&self) -> Option<&str> {
        self.sql.as_deref().filter(|sql| !sql.is_empty())
    }
}

/// Runs one invocation against `credentials`.
///
/// The session is closed on every path after a successful open. A close
/// failure is logged and does not turn a successful run into a failure, but
/// the closing line is only printed when close succeeded.
///
/// # Errors
/// Returns the first failure: connection, metadata, listing, statement or
/// report write.
pub async fn run<W: Write>(
    manager: &SessionManager,
    credentials: &Credentials,
    options: &RunOptions,
    out: &mut Report<W>,
) -> Result<()> {
    let scoped = manager
        .with_session(credentials, async |session| {
            session_body(session, options, &mut *out).await
        })
        .await?;

    scoped.result?;

    if scoped.close.is_ok() {
        out.line(CLOSED)?;
    }
    out.flush()
}

async fn session_body<W: Write>(
    session: &mut dyn DatabaseSession,
    options: &RunOptions,
    out: &mut Report<W>,
) -> Result<()> {
    out.line(CONNECTED)?;
    metadata::report(session, out).await?;

    if options.print_tables {
        tables::print_tables(session, options.table_pattern.as_deref(), out).await?;
    }

    if let Some(sql) = options.statement() {
        statement::print_statement(session, sql, out).await?;
    }

    Ok(())
}
