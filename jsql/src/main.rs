//! jsql command-line database client.
//!
//! Connects to one database, prints server and driver metadata, optionally
//! lists tables and executes a single statement, then disconnects.
//!
//! # Security Guarantees
//! - Passwords are never printed or logged
//! - Endpoint addresses are redacted before they are shown

use clap::Parser;
use jsql::{Cli, execute};
use jsql_core::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging failure is not fatal; the report does not depend on it
    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("Warning: {}", e);
    }

    let code = execute(
        &cli,
        |name| std::env::var(name).ok(),
        std::io::stdout().lock(),
        &mut std::io::stderr(),
    )
    .await;

    std::process::exit(code);
}
