//! Command-line tests: argument handling, exit codes and full runs.
//!
//! This test suite covers:
//! - Missing credential exit codes with usage synopsis and no connection
//! - Environment fallback for every credential
//! - Full runs against SQLite files, including failures after connect
//! - Driver listing
//!
//! # Security Testing
//! - Passwords never appear on stdout or stderr

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

use clap::Parser;
use jsql::{Cli, execute};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

struct Outcome {
    code: i32,
    stdout: String,
    stderr: String,
}

async fn jsql<F>(args: &[&str], env: F) -> Outcome
where
    F: Fn(&str) -> Option<String>,
{
    let cli = Cli::try_parse_from(std::iter::once("jsql").chain(args.iter().copied())).unwrap();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = execute(&cli, env, &mut stdout, &mut stderr).await;
    Outcome {
        code,
        stdout: String::from_utf8(stdout).unwrap(),
        stderr: String::from_utf8(stderr).unwrap(),
    }
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

/// An empty file, which SQLite opens as an empty database.
fn empty_database(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("app.db");
    std::fs::File::create(&path).unwrap();
    path
}

async fn sql(path: &Path, statement: &str) -> Outcome {
    let address = path.to_string_lossy().to_string();
    jsql(
        &["-j", address.as_str(), "-u", "local", "-p", "hunter2", "-s", statement],
        no_env,
    )
    .await
}

// =============================================================================
// Missing credentials
// =============================================================================

#[tokio::test]
async fn test_missing_endpoint_exit_code() {
    let out = jsql(&["-u", "me", "-p", "pw", "-t"], no_env).await;

    assert_eq!(out.code, 2);
    assert!(out.stdout.is_empty());
    assert!(
        out.stderr
            .starts_with("JDBC URL is missing. Use -j option or JSQL_JDBC_URL environment variable.\n")
    );
    assert!(out.stderr.contains("Usage: jsql"));
}

#[tokio::test]
async fn test_missing_user_exit_code() {
    let out = jsql(&["-j", "sqlite::memory:", "-p", "pw"], no_env).await;

    assert_eq!(out.code, 3);
    assert!(out.stderr.contains("User name is missing"));
    assert!(out.stderr.contains("Usage: jsql"));
}

#[tokio::test]
async fn test_missing_password_exit_code() {
    let out = jsql(&["-j", "sqlite::memory:", "-u", "me"], no_env).await;

    assert_eq!(out.code, 4);
    assert!(out.stderr.contains("User password is missing"));
    assert!(out.stderr.contains("Usage: jsql"));
}

#[tokio::test]
async fn test_first_missing_credential_wins() {
    let out = jsql(&[], no_env).await;
    assert_eq!(out.code, 2);

    let out = jsql(&["-j", "sqlite::memory:"], no_env).await;
    assert_eq!(out.code, 3);
}

#[tokio::test]
async fn test_stacktrace_never_applies_to_missing_credentials() {
    let out = jsql(&["-S"], no_env).await;

    assert_eq!(out.code, 2);
    assert!(!out.stderr.contains("Caused by"));
}

#[test]
fn test_missing_endpoint_process_exit() {
    let output = Command::new(env!("CARGO_BIN_EXE_jsql"))
        .args(["-u", "me", "-p", "pw"])
        .env_remove("JSQL_JDBC_URL")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("JDBC URL is missing"));
    assert!(stderr.contains("Usage: jsql"));
}

// =============================================================================
// SQLite runs
// =============================================================================

#[tokio::test]
async fn test_sqlite_environment_credentials() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);
    let address = path.to_string_lossy().to_string();
    let env = env_of(&[
        ("JSQL_JDBC_URL", address.as_str()),
        ("JSQL_USER_NAME", "env_user"),
        ("JSQL_USER_PASSWORD", "env_secret"),
    ]);

    let out = jsql(&["-t"], env).await;

    assert_eq!(out.code, 0, "stderr: {}", out.stderr);
    assert!(out.stdout.starts_with("Connection established successfully.\n"));
    assert!(out.stdout.contains("User name       : env_user\n"));
    assert!(out.stdout.contains("\nTables:\nNo tables in the database.\n\n"));
    assert!(out.stdout.ends_with("Connection closed.\n"));
    assert!(!out.stdout.contains("env_secret"));
}

#[tokio::test]
async fn test_sqlite_statements_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);

    let out = sql(&path, "CREATE TABLE t (id INTEGER, name TEXT)").await;
    assert_eq!(out.code, 0, "stderr: {}", out.stderr);
    assert!(out.stdout.contains("\nSQL:\nCREATE TABLE t (id INTEGER, name TEXT)\n\nResult: 0\n\n"));

    let out = sql(&path, "INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, 'c')").await;
    assert!(out.stdout.contains("\nResult: 3\n\n"));

    let out = sql(&path, "UPDATE t SET name = 'x' WHERE id < 3").await;
    assert!(out.stdout.contains("\nResult: 2\n\n"));

    let out = sql(&path, "SELECT id,name FROM t ORDER BY id").await;
    assert_eq!(out.code, 0);
    assert!(
        out.stdout
            .contains("\nSQL:\nSELECT id,name FROM t ORDER BY id\n\nid,name\n1,x\n2,x\n3,c\n\nConnection closed.\n")
    );
    assert!(!out.stdout.contains("hunter2"));
    assert!(out.stderr.is_empty());
}

#[tokio::test]
async fn test_sqlite_table_pattern() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);
    for ddl in [
        "CREATE TABLE zebra (id INTEGER)",
        "CREATE TABLE apple (id INTEGER)",
        "CREATE TABLE Banana (id INTEGER)",
    ] {
        assert_eq!(sql(&path, ddl).await.code, 0);
    }
    let address = path.to_string_lossy().to_string();

    let out = jsql(&["-j", address.as_str(), "-u", "u", "-p", "p", "-t"], no_env).await;
    assert!(out.stdout.contains("\nTables:\nBanana\napple\nzebra\n\n"));

    let out = jsql(&["-j", address.as_str(), "-u", "u", "-p", "p", "-t", "-r", "^a"], no_env).await;
    assert!(out.stdout.contains("\nTables (^a):\napple\n\n"));
}

#[tokio::test]
async fn test_sqlite_null_cell_fails_after_connect() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);
    assert_eq!(sql(&path, "CREATE TABLE t (id INTEGER, note TEXT)").await.code, 0);
    assert_eq!(sql(&path, "INSERT INTO t VALUES (1, NULL)").await.code, 0);

    let out = sql(&path, "SELECT id, note FROM t").await;

    assert_eq!(out.code, 1);
    assert!(out.stdout.contains("\nSQL:\nSELECT id, note FROM t\n\n"));
    assert!(!out.stdout.contains("Connection closed."));
    assert!(out.stderr.contains("NULL"), "stderr: {}", out.stderr);
}

#[tokio::test]
async fn test_sqlite_bad_sql_with_stacktrace() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);
    let address = path.to_string_lossy().to_string();

    let brief = jsql(&["-j", address.as_str(), "-u", "u", "-p", "p", "-s", "SELEC 1"], no_env).await;
    let full = jsql(&["-j", address.as_str(), "-u", "u", "-p", "p", "-s", "SELEC 1", "-S"], no_env).await;

    assert_eq!(brief.code, 1);
    assert_eq!(full.code, 1);
    assert_eq!(brief.stderr.lines().count(), 1);
    assert!(brief.stderr.contains("syntax error"), "stderr: {}", brief.stderr);
    assert!(!brief.stderr.contains("Caused by"));
    assert!(full.stderr.contains("Caused by"));
    assert!(full.stderr.contains("syntax error"));
}

#[tokio::test]
async fn test_sqlite_invalid_pattern_fails() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);
    assert_eq!(sql(&path, "CREATE TABLE t (id INTEGER)").await.code, 0);
    let address = path.to_string_lossy().to_string();

    let out = jsql(&["-j", address.as_str(), "-u", "u", "-p", "p", "-t", "-r", "("], no_env).await;

    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("Invalid table pattern"), "stderr: {}", out.stderr);
}

#[tokio::test]
async fn test_sqlite_quiet_run() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);
    let address = path.to_string_lossy().to_string();

    let out = jsql(
        &["-j", address.as_str(), "-u", "u", "-p", "p", "-q", "-t", "-s", "SELECT 1"],
        no_env,
    )
    .await;

    assert_eq!(out.code, 0);
    assert!(out.stdout.is_empty());
    assert!(out.stderr.is_empty());
}

#[tokio::test]
async fn test_unreachable_database_is_exit_one() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.db");
    let address = missing.to_string_lossy().to_string();

    let out = jsql(&["-j", address.as_str(), "-u", "u", "-p", "secret"], no_env).await;

    assert_eq!(out.code, 1);
    assert!(out.stdout.is_empty());
    assert!(!out.stderr.contains("secret"));
}

#[tokio::test]
async fn test_sqlite_real_keeps_fraction() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);

    let out = sql(&path, "SELECT 1.0 AS x, 2.5 AS y, 3 AS z").await;

    assert_eq!(out.code, 0, "stderr: {}", out.stderr);
    assert!(out.stdout.contains("\nx,y,z\n1.0,2.5,3\n\n"), "stdout: {}", out.stdout);
}

#[tokio::test]
async fn test_sqlite_blob_is_base64() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);

    let out = sql(&path, "SELECT X'6869' AS b").await;

    assert_eq!(out.code, 0, "stderr: {}", out.stderr);
    assert!(out.stdout.contains("\nb\nbase64:aGk=\n\n"), "stdout: {}", out.stdout);
}

// =============================================================================
// Process-level failure output
// =============================================================================

/// Runs the built binary with a clean environment for jsql and logging.
fn jsql_process(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_jsql"))
        .args(args)
        .env_remove("JSQL_JDBC_URL")
        .env_remove("JSQL_USER_NAME")
        .env_remove("JSQL_USER_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_bad_sql_prints_one_stderr_line() {
    let dir = TempDir::new().unwrap();
    let path = empty_database(&dir);
    let address = path.to_string_lossy().to_string();

    for quiet in [false, true] {
        let mut args = vec!["-j", address.as_str(), "-u", "u", "-p", "p", "-s", "SELEC 1"];
        if quiet {
            args.push("-q");
        }

        let output = jsql_process(&args);

        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8(output.stderr).unwrap();
        assert_eq!(stderr.lines().count(), 1, "quiet={} stderr: {}", quiet, stderr);
        assert!(stderr.starts_with("Statement execution failed: "));
        assert!(stderr.contains("syntax error"));
    }
}

#[test]
fn test_unreachable_database_prints_one_stderr_line() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.db");
    let address = missing.to_string_lossy().to_string();

    let output = jsql_process(&["-j", address.as_str(), "-u", "u", "-p", "secret"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.lines().count(), 1, "stderr: {}", stderr);
    assert!(stderr.starts_with("Database connection failed: "));
    assert!(!stderr.contains("secret"));
}

// =============================================================================
// Driver listing
// =============================================================================

#[tokio::test]
async fn test_list_drivers() {
    let out = jsql(&["--list-drivers"], no_env).await;

    assert_eq!(out.code, 0);
    assert!(out.stdout.starts_with("Supported Database Types:\n\n"));
    assert!(out.stdout.contains("PostgreSQL:\n  Connection: postgres://"));
    assert!(out.stdout.contains("MySQL:\n"));
    assert!(out.stdout.contains("SQLite:\n  Connection: sqlite://"));
}
