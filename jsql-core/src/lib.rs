//! Core of the jsql command-line database client.
//!
//! One invocation opens a single session, prints server metadata, optionally
//! lists tables and executes one statement, then closes the session. This
//! crate holds everything except argument parsing: credential resolution,
//! the session lifecycle, the driver layer and the driver-agnostic rendering
//! of results into flat text.
//!
//! # Security Guarantees
//! - Passwords are kept in zeroizing containers and never logged
//! - Endpoint addresses are redacted before they reach logs or output
//!
//! # Architecture
//! - `credentials`: explicit options merged with environment defaults
//! - `drivers`: driver registry, session trait, sqlx-backed drivers
//! - `session`: scoped open/close around the whole run
//! - `metadata`, `tables`, `statement`: the three report sections
//! - `run`: the invocation flow tying them together

pub mod credentials;
pub mod drivers;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod report;
pub mod run;
pub mod session;
pub mod statement;
pub mod tables;

// Re-export commonly used types
pub use credentials::{Credentials, resolve};
pub use drivers::{ConnectionConfig, DatabaseSession, Driver, DriverRegistry};
pub use error::{JsqlError, Result};
pub use logging::init_logging;
pub use metadata::{ServerInfo, Version};
pub use report::Report;
pub use run::{RunOptions, run};
pub use session::{Scoped, SessionManager};
pub use statement::{QueryOutcome, RowSet, RowSetBuilder};
pub use tables::TableListing;
