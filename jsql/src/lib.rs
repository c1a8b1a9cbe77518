//! Command-line layer for jsql.
//!
//! Parses arguments, resolves credentials against the environment, runs one
//! session through `jsql-core` and maps the outcome to a process exit code.
//! Kept as a library so the whole flow can be driven from tests with
//! in-memory output buffers and a fake environment.

use clap::{CommandFactory, Parser};
use jsql_core::{
    ConnectionConfig, DriverRegistry, JsqlError, Report, RunOptions, SessionManager, resolve, run,
};
use std::io::Write;

/// Exit code for a completed run.
pub const EXIT_SUCCESS: i32 = 0;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "jsql")]
#[command(about = "Connect to a database, describe it, list tables and run one statement")]
#[command(version)]
#[command(long_about = "
jsql - Minimal command-line database client

Opens one session, prints server and driver metadata, optionally lists the
tables the session can see and executes a single SQL statement, then closes
the session.

ENVIRONMENT:
  JSQL_JDBC_URL        endpoint address when -j is not given
  JSQL_USER_NAME       user name when -u is not given
  JSQL_USER_PASSWORD   password when -p is not given

EXIT CODES:
  0  success
  1  connection, statement or output failure
  2  endpoint address missing
  3  user name missing
  4  password missing

EXAMPLES:
  jsql -j postgres://localhost:5432/app -u admin -p secret -t
  jsql -j sqlite:///var/lib/app.db -u local -p unused -s 'SELECT * FROM users'
  jsql -j mysql://localhost/shop -u root -p secret -t -r '^order'
")]
pub struct Cli {
    /// Endpoint address
    #[arg(
        short = 'j',
        long = "jdbc",
        visible_alias = "url",
        value_name = "URL",
        help = "Database address, e.g. postgres://host/db (credentials will be sanitized in output)"
    )]
    pub jdbc: Option<String>,

    /// User name
    #[arg(short, long, value_name = "NAME", help = "User name")]
    pub user: Option<String>,

    /// Password
    #[arg(short, long, value_name = "PASSWORD", help = "User password")]
    pub password: Option<String>,

    /// Table filter
    #[arg(
        short,
        long,
        value_name = "REGEX",
        help = "Regex for tables. List tables that contain a match"
    )]
    pub regex: Option<String>,

    /// Statement to execute
    #[arg(short, long, value_name = "SQL", help = "SQL statement to be executed")]
    pub sql: Option<String>,

    /// Full failure diagnostics
    #[arg(
        short = 'S',
        long,
        help = "Print the full error chain on failure"
    )]
    pub stacktrace: bool,

    /// Print tables
    #[arg(short, long, help = "Print all tables in the database")]
    pub tables: bool,

    /// Suppress output
    #[arg(short, long, help = "Do not print output, except errors")]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// List drivers
    #[arg(long, help = "List compiled-in database drivers and exit")]
    pub list_drivers: bool,
}

impl Cli {
    /// What to do once a session is open.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            print_tables: self.tables,
            table_pattern: self.regex.clone(),
            sql: self.sql.clone(),
        }
    }

    /// Connection tuning derived from the verbosity.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::default().with_statement_logging(self.verbose >= 2)
    }
}

/// One-line usage synopsis, as printed after a missing credential.
pub fn usage() -> String {
    Cli::command().render_usage().to_string()
}

/// Runs the command line and returns the process exit code.
///
/// `env` looks up environment variables; the report goes to `stdout` and
/// every failure message to `stderr`.
pub async fn execute<F, O, E>(cli: &Cli, env: F, stdout: O, stderr: &mut E) -> i32
where
    F: Fn(&str) -> Option<String>,
    O: Write,
    E: Write,
{
    let registry = DriverRegistry::with_default_drivers();

    if cli.list_drivers {
        return match list_supported_databases(&registry, stdout) {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => report_failure(e, cli.stacktrace, stderr),
        };
    }

    let credentials = match resolve(
        cli.jdbc.as_deref(),
        cli.user.as_deref(),
        cli.password.as_deref(),
        env,
    ) {
        Ok(credentials) => credentials,
        Err(e) => {
            // Never a stack trace for configuration problems
            let _ = writeln!(stderr, "{}", e);
            let _ = writeln!(stderr, "{}", usage());
            return e.exit_code();
        }
    };

    let manager = SessionManager::new(registry, cli.connection_config());
    let mut report = Report::new(stdout, cli.quiet);

    match run(&manager, &credentials, &cli.run_options(), &mut report).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            // Whatever the report already holds still reaches the terminal
            let _ = report.flush();
            report_failure(e, cli.stacktrace, stderr)
        }
    }
}

/// Prints a run failure and returns its exit code.
fn report_failure<E: Write>(error: JsqlError, stacktrace: bool, stderr: &mut E) -> i32 {
    tracing::debug!("Run failed: {}", error);
    let code = error.exit_code();
    let _ = if stacktrace {
        writeln!(stderr, "{:?}", anyhow::Error::from(error))
    } else {
        writeln!(stderr, "{}", error)
    };
    code
}

/// Lists compiled-in drivers and their address formats.
fn list_supported_databases<O: Write>(registry: &DriverRegistry, out: O) -> jsql_core::Result<()> {
    let mut report = Report::new(out, false);
    report.line("Supported Database Types:")?;
    report.blank()?;

    for driver in registry.drivers() {
        report.line(format!("{}:", driver.name()))?;
        for format in driver.url_formats() {
            report.line(format!("  Connection: {}", format))?;
        }
        report.blank()?;
    }

    report.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_options() {
        let cli = Cli::try_parse_from([
            "jsql", "-j", "sqlite::memory:", "-u", "me", "-p", "pw", "-r", "^a", "-s", "SELECT 1",
            "-S", "-t", "-q", "-vv",
        ])
        .unwrap();

        assert_eq!(cli.jdbc.as_deref(), Some("sqlite::memory:"));
        assert_eq!(cli.user.as_deref(), Some("me"));
        assert_eq!(cli.password.as_deref(), Some("pw"));
        assert_eq!(cli.regex.as_deref(), Some("^a"));
        assert_eq!(cli.sql.as_deref(), Some("SELECT 1"));
        assert!(cli.stacktrace);
        assert!(cli.tables);
        assert!(cli.quiet);
        assert_eq!(cli.verbose, 2);
        assert!(cli.connection_config().log_statements);
    }

    #[test]
    fn test_url_alias() {
        let cli = Cli::try_parse_from(["jsql", "--url", "postgres://h/db"]).unwrap();
        assert_eq!(cli.jdbc.as_deref(), Some("postgres://h/db"));
    }

    #[test]
    fn test_run_options() {
        let cli = Cli::try_parse_from(["jsql", "-t", "-r", "x", "-s", ""]).unwrap();
        let options = cli.run_options();
        assert!(options.print_tables);
        assert_eq!(options.table_pattern.as_deref(), Some("x"));
        assert_eq!(options.statement(), None);
    }

    #[test]
    fn test_usage_synopsis() {
        let usage = usage();
        assert!(usage.starts_with("Usage: jsql"));
        assert_eq!(usage.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_scheme_fails_without_output() {
        let cli = Cli::try_parse_from(["jsql", "-S", "-j", "nosuch://x", "-u", "u", "-p", "p"]).unwrap();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let code = execute(&cli, |_| None, &mut stdout, &mut stderr).await;

        assert_eq!(code, 1);
        let message = String::from_utf8(stderr).unwrap();
        assert!(message.contains("No suitable driver found"), "{}", message);
        assert!(stdout.is_empty());
    }
}
