//! Table enumeration, ordering and pattern filtering.
//!
//! Drivers return every table-like object they can see, unsorted and with
//! duplicates intact. This module sorts the full list before filtering, so
//! the filter never affects order.

use crate::drivers::DatabaseSession;
use crate::error::JsqlError;
use crate::report::Report;
use crate::Result;
use regex::Regex;
use std::io::Write;

/// Line printed when the session sees no tables at all.
pub const NO_TABLES: &str = "No tables in the database.";

/// Result of listing tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableListing {
    /// The session sees no tables; the pattern was never applied
    Empty,
    /// Sorted names that matched the pattern (all names without a pattern)
    Matches(Vec<String>),
}

impl TableListing {
    /// Sorts `names` and keeps the ones the pattern finds a match in.
    ///
    /// The pattern is compiled only when there is something to filter.
    ///
    /// # Errors
    /// Returns [`JsqlError::InvalidPattern`] if `pattern` is not a valid
    /// regular expression and the name list is non-empty.
    pub fn build(mut names: Vec<String>, pattern: Option<&str>) -> Result<Self> {
        if names.is_empty() {
            return Ok(Self::Empty);
        }

        names.sort();

        let Some(pattern) = pattern else {
            return Ok(Self::Matches(names));
        };

        let regex = Regex::new(pattern).map_err(|source| JsqlError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        names.retain(|name| regex.is_match(name));
        Ok(Self::Matches(names))
    }

    /// Output lines for this listing, excluding header and trailing blank.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Empty => vec![NO_TABLES.to_string()],
            Self::Matches(names) => names.clone(),
        }
    }
}

/// Header line for the table section.
pub fn header(pattern: Option<&str>) -> String {
    match pattern {
        Some(pattern) => format!("Tables ({}):", pattern),
        None => "Tables:".to_string(),
    }
}

/// Lists the session's tables, sorted and filtered.
pub async fn list(session: &mut dyn DatabaseSession, pattern: Option<&str>) -> Result<TableListing> {
    let names = session.list_tables().await?;
    tracing::debug!("Session reports {} tables", names.len());
    TableListing::build(names, pattern)
}

/// Writes the table section: blank line, header, names, blank line.
pub async fn print_tables<W: Write>(
    session: &mut dyn DatabaseSession,
    pattern: Option<&str>,
    out: &mut Report<W>,
) -> Result<TableListing> {
    out.blank()?;
    out.line(header(pattern))?;
    let listing = list(session, pattern).await?;
    out.lines(listing.lines())?;
    out.blank()?;
    Ok(listing)
}
